//! Batched cache warming.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::application::dto::{PrefetchOutcome, PrefetchReport};
use crate::domain::ports::{MediaCachePort, MediaFetcherPort};

/// Fetches many URLs into the persistent cache ahead of need.
#[derive(Clone)]
pub struct PrefetchBatch {
    cache: Arc<dyn MediaCachePort>,
    fetcher: Arc<dyn MediaFetcherPort>,
}

impl std::fmt::Debug for PrefetchBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchBatch").finish_non_exhaustive()
    }
}

impl PrefetchBatch {
    /// Creates a batch over the given cache and fetcher.
    #[must_use]
    pub fn new(cache: Arc<dyn MediaCachePort>, fetcher: Arc<dyn MediaFetcherPort>) -> Self {
        Self { cache, fetcher }
    }

    /// Prefetches every distinct URL concurrently and waits for all to settle.
    ///
    /// Never fails as a whole; per-URL failures are recorded in the report
    /// and do not affect sibling URLs.
    pub async fn prefetch_all<I, S>(&self, urls: I) -> PrefetchReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let urls: Vec<String> = urls
            .into_iter()
            .map(Into::into)
            .filter(|url| seen.insert(url.clone()))
            .collect();

        debug!(count = urls.len(), "Starting prefetch batch");

        let outcomes = join_all(urls.iter().map(|url| self.prefetch_one(url))).await;
        let report = PrefetchReport {
            outcomes: urls.into_iter().zip(outcomes).collect(),
        };

        info!(
            fetched = report.fetched(),
            cached = report.cached(),
            failed = report.failed(),
            "Prefetch batch complete"
        );
        report
    }

    /// Prefetches a single URL unless a valid entry is already cached.
    pub async fn prefetch_one(&self, url: &str) -> PrefetchOutcome {
        if self.cache.read(url).await.is_some() {
            return PrefetchOutcome::Cached;
        }

        match self.fetcher.fetch(url).await {
            Ok(payload) => {
                self.cache.write(url, payload).await;
                PrefetchOutcome::Fetched
            }
            Err(e) => {
                warn!(url, error = %e, "Prefetch failed");
                PrefetchOutcome::Failed(e)
            }
        }
    }
}
