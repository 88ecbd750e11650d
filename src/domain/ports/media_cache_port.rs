//! Port definition for the persistent media cache.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::domain::entities::CacheEntry;
use crate::domain::errors::CacheResult;

/// Port for durable URL-keyed payload storage.
///
/// Keys are source URLs, matched exactly and case-sensitively.
/// Implementations must be thread-safe; concurrent writes to one key are
/// last-writer-wins.
#[async_trait]
pub trait MediaCachePort: Send + Sync {
    /// Loads the stored entry for `url` without any validity checks.
    async fn load_entry(&self, url: &str) -> CacheResult<Option<CacheEntry>>;

    /// Stores `entry` for `url`, replacing any prior entry.
    async fn store_entry(&self, url: &str, entry: &CacheEntry) -> CacheResult<()>;

    /// Returns a servable entry, or `None` if absent, stale, version-mismatched
    /// or unreadable. Never fails.
    async fn read(&self, url: &str) -> Option<CacheEntry> {
        match self.load_entry(url).await {
            Ok(Some(entry)) if entry.is_fresh() => {
                trace!(url, "Cache hit");
                Some(entry)
            }
            Ok(Some(entry)) => {
                debug!(
                    url,
                    captured_at = %entry.captured_at,
                    format_version = %entry.format_version,
                    "Cache entry no longer valid"
                );
                None
            }
            Ok(None) => {
                trace!(url, "Cache miss");
                None
            }
            Err(e) => {
                warn!(url, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Stores `payload` stamped with the current time and format version.
    /// Storage errors are logged and swallowed.
    async fn write(&self, url: &str, payload: Bytes) {
        let entry = CacheEntry::new(payload);
        if let Err(e) = self.store_entry(url, &entry).await {
            warn!(url, error = %e, "Failed to write cache entry");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::FailingMediaCache;
    use super::*;

    #[tokio::test]
    async fn test_failing_storage_degrades_to_miss() {
        let cache = FailingMediaCache;
        cache.write("img/a.png", Bytes::from_static(b"data")).await;
        assert!(cache.read("img/a.png").await.is_none());
    }
}
