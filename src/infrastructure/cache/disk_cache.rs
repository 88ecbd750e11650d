//! Disk-based media cache for persistence across sessions.
//!
//! Each entry is a payload file plus a JSON metadata sidecar, both named by a
//! hash of the source URL.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, trace};

use crate::domain::entities::CacheEntry;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::MediaCachePort;

const PAYLOAD_EXTENSION: &str = "bin";
const META_SUFFIX: &str = ".meta.json";

/// Metadata stored alongside each payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    captured_at: DateTime<Utc>,
    format_version: String,
    size: u64,
}

/// Disk-based cache that persists raw payloads.
#[derive(Debug)]
pub struct DiskMediaCache {
    cache_dir: PathBuf,
}

impl DiskMediaCache {
    /// Creates a new disk cache in the specified directory.
    ///
    /// # Errors
    /// Returns error if cache directory cannot be created.
    pub async fn new(cache_dir: PathBuf) -> CacheResult<Self> {
        fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to create cache dir: {e}")))?;
        Ok(Self { cache_dir })
    }

    /// Creates a cache in the default location (e.g. `~/.cache/lazyfetch/media/`).
    ///
    /// # Errors
    /// Returns error if cache directory cannot be created.
    pub async fn default_location() -> CacheResult<Self> {
        Self::new(default_cache_dir()).await
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the file stem for a URL.
    fn key_for(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }

    fn payload_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{key}.{PAYLOAD_EXTENSION}"))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{key}{META_SUFFIX}"))
    }

    /// Returns the number of stored entries, valid or not.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be read.
    pub async fn len(&self) -> CacheResult<usize> {
        let mut entries = fs::read_dir(&self.cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to read cache dir: {e}")))?;

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().ends_with(META_SUFFIX) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Returns true if nothing is stored.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be read.
    pub async fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait]
impl MediaCachePort for DiskMediaCache {
    async fn load_entry(&self, url: &str) -> CacheResult<Option<CacheEntry>> {
        let key = Self::key_for(url);

        let meta_bytes = match fs::read(self.meta_path(&key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(url, "Disk cache miss");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let meta: EntryMeta = serde_json::from_slice(&meta_bytes)?;

        if meta.url != url {
            debug!(url, stored = %meta.url, "Disk cache key collision");
            return Ok(None);
        }

        let payload = match fs::read(self.payload_path(&key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::Corrupt(format!("payload missing for {url}")));
            }
            Err(e) => return Err(e.into()),
        };

        if payload.len() as u64 != meta.size {
            return Err(CacheError::Corrupt(format!(
                "payload size {} does not match recorded size {}",
                payload.len(),
                meta.size
            )));
        }

        trace!(url, size = meta.size, "Disk cache entry found");
        Ok(Some(CacheEntry {
            payload: Bytes::from(payload),
            captured_at: meta.captured_at,
            format_version: meta.format_version,
        }))
    }

    async fn store_entry(&self, url: &str, entry: &CacheEntry) -> CacheResult<()> {
        let key = Self::key_for(url);
        let meta = EntryMeta {
            url: url.to_string(),
            captured_at: entry.captured_at,
            format_version: entry.format_version.clone(),
            size: entry.payload.len() as u64,
        };
        let meta_json = serde_json::to_vec_pretty(&meta)?;

        let dir = self.cache_dir.clone();
        let payload_path = self.payload_path(&key);
        let meta_path = self.meta_path(&key);
        let payload = entry.payload.clone();

        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            write_atomic(&dir, &payload_path, &payload)?;
            write_atomic(&dir, &meta_path, &meta_json)
        })
        .await
        .map_err(|e| CacheError::IoError(format!("Cache write task panicked: {e}")))?
        .map_err(|e| CacheError::IoError(format!("Failed to write cache entry: {e}")))?;

        debug!(url, size = meta.size, "Stored media in disk cache");
        Ok(())
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
    temp_file.write_all(bytes)?;
    temp_file.flush()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Returns the default cache directory path.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from(crate::APP_QUALIFIER, crate::APP_ORGANIZATION, crate::NAME)
        .map_or_else(
            || std::env::temp_dir().join(crate::NAME).join("cache").join("media"),
            |dirs| dirs.cache_dir().join("media"),
        )
}
