//! In-memory LRU media cache.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;
use tracing::trace;

use crate::domain::entities::CacheEntry;
use crate::domain::errors::CacheResult;
use crate::domain::ports::MediaCachePort;

/// Default maximum number of entries kept in memory.
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// Process-local cache of payloads keyed by URL.
///
/// Does not survive restarts. LRU eviction at capacity is its only removal.
pub struct MemoryMediaCache {
    cache: RwLock<LruCache<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryMediaCache {
    /// Creates a new cache with the specified capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default capacity.
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }

    /// Stores a prepared entry, e.g. one carried over from another store.
    pub async fn insert_entry(&self, url: &str, entry: CacheEntry) {
        self.cache.write().await.put(url.to_string(), entry);
    }

    /// Returns the stored entry without validity checks or LRU promotion.
    pub async fn peek(&self, url: &str) -> Option<CacheEntry> {
        self.cache.read().await.peek(url).cloned()
    }

    /// Returns the number of stored entries, valid or not.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns lookup statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
        }
    }
}

impl Default for MemoryMediaCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Statistics about raw entry lookups.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Lookups that found an entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {:.1}% hit rate ({} hits, {} misses)",
            self.hit_rate, self.hits, self.misses
        )
    }
}

#[async_trait]
impl MediaCachePort for MemoryMediaCache {
    async fn load_entry(&self, url: &str) -> CacheResult<Option<CacheEntry>> {
        let mut cache = self.cache.write().await;
        if let Some(entry) = cache.get(url) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(url, "Memory cache entry found");
            Ok(Some(entry.clone()))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            Ok(None)
        }
    }

    async fn store_entry(&self, url: &str, entry: &CacheEntry) -> CacheResult<()> {
        self.cache.write().await.put(url.to_string(), entry.clone());
        Ok(())
    }
}
