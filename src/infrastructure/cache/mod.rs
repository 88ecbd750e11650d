//! Persistent cache adapters.

mod disk_cache;
mod memory_cache;

pub use disk_cache::{DiskMediaCache, default_cache_dir};
pub use memory_cache::{CacheStats, DEFAULT_CACHE_SIZE, MemoryMediaCache};
