//! Infrastructure layer with cache, network and configuration adapters.

/// Persistent cache backends.
pub mod cache;
/// Application configuration.
pub mod config;
/// HTTP fetching.
pub mod http;

pub use cache::{CacheStats, DiskMediaCache, MemoryMediaCache};
pub use config::{AppConfig, CacheBackend, CliArgs, Command, LogLevel, StorageManager};
pub use http::HttpMediaFetcher;
