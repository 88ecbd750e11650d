//! Media loading orchestrator.
//!
//! Resolves a URL through the persistent cache first and the network second,
//! and mounts display slots that publish render states as they progress.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::application::dto::SlotRequest;
use crate::domain::entities::{MediaOrigin, RenderState, ResolvedMedia};
use crate::domain::errors::FetchError;
use crate::domain::ports::{MediaCachePort, MediaFetcherPort};

use super::media_slot::MediaSlot;
use super::placeholder::{DEFAULT_PLACEHOLDER_HEIGHT, DEFAULT_PLACEHOLDER_WIDTH};
use super::prefetch::PrefetchBatch;
use super::visibility::{DEFAULT_MARGIN_PX, ViewportTracker};

type InFlightFetch = Shared<BoxFuture<'static, Result<Bytes, FetchError>>>;

/// Configuration for the media loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Look-ahead margin around the viewport for lazy slots.
    #[serde(default = "default_margin")]
    pub visibility_margin_px: f64,

    /// Share one in-flight fetch between concurrent misses for the same URL.
    #[serde(default)]
    pub coalesce_requests: bool,

    /// Placeholder aspect hint width.
    #[serde(default = "default_placeholder_width")]
    pub placeholder_width: u32,

    /// Placeholder aspect hint height.
    #[serde(default = "default_placeholder_height")]
    pub placeholder_height: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            visibility_margin_px: DEFAULT_MARGIN_PX,
            coalesce_requests: false,
            placeholder_width: DEFAULT_PLACEHOLDER_WIDTH,
            placeholder_height: DEFAULT_PLACEHOLDER_HEIGHT,
        }
    }
}

const fn default_margin() -> f64 {
    DEFAULT_MARGIN_PX
}

const fn default_placeholder_width() -> u32 {
    DEFAULT_PLACEHOLDER_WIDTH
}

const fn default_placeholder_height() -> u32 {
    DEFAULT_PLACEHOLDER_HEIGHT
}

/// Orchestrates cache lookups, network fetches and display slots.
///
/// Cheap to clone; clones share the cache, fetcher, viewport and in-flight map.
#[derive(Clone)]
pub struct MediaLoader {
    cache: Arc<dyn MediaCachePort>,
    fetcher: Arc<dyn MediaFetcherPort>,
    viewport: ViewportTracker,
    config: LoaderConfig,
    in_flight: Arc<Mutex<HashMap<String, InFlightFetch>>>,
}

impl std::fmt::Debug for MediaLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaLoader")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight.lock().len())
            .finish_non_exhaustive()
    }
}

impl MediaLoader {
    /// Creates a loader over the given cache and fetcher.
    #[must_use]
    pub fn new(
        cache: Arc<dyn MediaCachePort>,
        fetcher: Arc<dyn MediaFetcherPort>,
        viewport: ViewportTracker,
        config: LoaderConfig,
    ) -> Self {
        Self {
            cache,
            fetcher,
            viewport,
            config,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the shared viewport tracker.
    #[must_use]
    pub const fn viewport(&self) -> &ViewportTracker {
        &self.viewport
    }

    /// Returns the loader configuration.
    #[must_use]
    pub const fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Returns a prefetch batch over the same cache and fetcher.
    #[must_use]
    pub fn prefetcher(&self) -> PrefetchBatch {
        PrefetchBatch::new(self.cache.clone(), self.fetcher.clone())
    }

    /// Mounts a display slot.
    ///
    /// The returned receiver yields every render state the slot publishes,
    /// starting with the placeholder.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn mount(&self, request: SlotRequest) -> (MediaSlot, mpsc::UnboundedReceiver<RenderState>) {
        MediaSlot::mount(self.clone(), request)
    }

    /// Resolves `url` from the cache, falling back to the network.
    ///
    /// A successful network fetch is written to the cache before returning.
    ///
    /// # Errors
    /// Returns error if the URL is not cached and the fetch fails.
    pub async fn resolve(&self, url: &str) -> Result<ResolvedMedia, FetchError> {
        if let Some(entry) = self.cache.read(url).await {
            trace!(url, "Resolved from cache");
            return Ok(ResolvedMedia {
                payload: entry.payload,
                origin: MediaOrigin::Cache,
            });
        }

        let payload = if self.config.coalesce_requests {
            self.coalesced_fetch(url).await?
        } else {
            fetch_and_store(self.cache.clone(), self.fetcher.clone(), url.to_string()).await?
        };

        Ok(ResolvedMedia {
            payload,
            origin: MediaOrigin::Network,
        })
    }

    /// Number of coalesced fetches currently in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn coalesced_fetch(&self, url: &str) -> InFlightFetch {
        let mut in_flight = self.in_flight.lock();
        if let Some(existing) = in_flight.get(url) {
            debug!(url, "Joining in-flight fetch");
            return existing.clone();
        }

        let cache = self.cache.clone();
        let fetcher = self.fetcher.clone();
        let registry = Arc::clone(&self.in_flight);
        let key = url.to_string();
        // Spawned so the fetch runs to completion even if every waiter is cancelled.
        let task = tokio::spawn(async move {
            let result = fetch_and_store(cache, fetcher, key.clone()).await;
            registry.lock().remove(&key);
            result
        });
        let fetch = async move {
            task.await
                .unwrap_or_else(|e| Err(FetchError::request(format!("fetch task failed: {e}"))))
        }
        .boxed()
        .shared();

        in_flight.insert(url.to_string(), fetch.clone());
        fetch
    }
}

async fn fetch_and_store(
    cache: Arc<dyn MediaCachePort>,
    fetcher: Arc<dyn MediaFetcherPort>,
    url: String,
) -> Result<Bytes, FetchError> {
    debug!(url = %url, "Downloading media from network");
    let payload = fetcher.fetch(&url).await?;
    cache.write(&url, payload.clone()).await;
    debug!(url = %url, size = payload.len(), "Media downloaded and cached");
    Ok(payload)
}
