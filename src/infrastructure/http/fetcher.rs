//! HTTP media fetcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::errors::FetchError;
use crate::domain::ports::MediaFetcherPort;
use crate::infrastructure::config::NetworkConfig;

/// Downloads payloads over HTTP(S) with a bounded number of concurrent requests.
#[derive(Debug, Clone)]
pub struct HttpMediaFetcher {
    client: Client,
    semaphore: Arc<Semaphore>,
}

impl HttpMediaFetcher {
    /// Creates a fetcher from network settings.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(config: &NetworkConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::client(e.to_string()))?;

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1))),
        })
    }

    /// Returns the number of downloads that may start right now.
    #[must_use]
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[async_trait]
impl MediaFetcherPort for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| FetchError::request(format!("download limiter closed: {e}")))?;

        debug!(url, "Downloading media");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::body(e.to_string()))?;

        debug!(url, size = bytes.len(), "Downloaded media");
        Ok(bytes)
    }
}
