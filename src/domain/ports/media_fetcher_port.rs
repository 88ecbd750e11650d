//! Port definition for network retrieval of media bytes.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::FetchError;

/// Port for single-shot GET of a URL's raw bytes.
///
/// Timeouts and connection limits belong to the implementation.
#[async_trait]
pub trait MediaFetcherPort: Send + Sync {
    /// Fetches the bytes at `url`. Any non-success outcome is an error.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::Semaphore;

    /// Mock fetcher that records calls and serves deterministic bodies.
    #[derive(Default)]
    pub struct MockMediaFetcher {
        calls: Mutex<Vec<String>>,
        failing: HashSet<String>,
        gate: Option<Arc<Semaphore>>,
    }

    impl MockMediaFetcher {
        /// Creates a fetcher that succeeds for every URL.
        pub fn new() -> Self {
            Self::default()
        }

        /// Body served for `url`.
        pub fn body_for(url: &str) -> Bytes {
            Bytes::from(format!("payload:{url}"))
        }

        /// Makes fetches of `url` fail with a 404.
        #[must_use]
        pub fn failing_on(mut self, url: &str) -> Self {
            self.failing.insert(url.to_string());
            self
        }

        /// Holds every fetch until a permit is added to `gate`.
        #[must_use]
        pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
            self.gate = Some(gate);
            self
        }

        /// Number of fetches issued for `url`.
        pub fn calls_for(&self, url: &str) -> usize {
            self.calls.lock().iter().filter(|c| *c == url).count()
        }

        /// Number of fetches issued overall.
        pub fn total_calls(&self) -> usize {
            self.calls.lock().len()
        }

        /// Waits until at least `expected` fetches have been issued.
        pub async fn wait_for_calls(&self, expected: usize) {
            tokio::time::timeout(Duration::from_secs(2), async {
                while self.total_calls() < expected {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("timed out waiting for fetch calls");
        }
    }

    #[async_trait]
    impl MediaFetcherPort for MockMediaFetcher {
        async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
            self.calls.lock().push(url.to_string());

            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate closed").forget();
            }

            if self.failing.contains(url) {
                return Err(FetchError::status(404, "Not Found"));
            }

            Ok(Self::body_for(url))
        }
    }
}
