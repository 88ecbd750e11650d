//! Persistent cache error types.

use thiserror::Error;

/// Result type for raw cache storage operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors raised by a cache storage backend.
///
/// These never reach display slots: reads degrade to a miss and writes are
/// swallowed after logging.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// I/O error while reading or writing an entry.
    #[error("IO error: {0}")]
    IoError(String),
    /// Stored metadata could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// Stored entry is inconsistent with its metadata.
    #[error("Corrupt entry: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}
