//! Cached media payloads and the rules deciding whether they may be served.

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};

/// Tag identifying the stored-entry schema.
/// Bumping it invalidates every entry written under an earlier tag.
pub const CACHE_FORMAT_VERSION: &str = "v1";

/// Maximum age of a cache entry before it is treated as absent.
pub const MAX_AGE: TimeDelta = TimeDelta::days(7);

/// A payload stored in the persistent cache, keyed by its source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Raw fetched bytes. Never decoded.
    pub payload: Bytes,
    /// When the entry was written.
    pub captured_at: DateTime<Utc>,
    /// Schema tag in effect when the entry was written.
    pub format_version: String,
}

impl CacheEntry {
    /// Creates an entry captured now under the current format version.
    #[must_use]
    pub fn new(payload: Bytes) -> Self {
        Self::with_captured_at(payload, Utc::now())
    }

    /// Creates an entry with an explicit capture time.
    #[must_use]
    pub fn with_captured_at(payload: Bytes, captured_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            captured_at,
            format_version: CACHE_FORMAT_VERSION.to_string(),
        }
    }

    /// Age of the entry relative to `now`.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.captured_at)
    }

    /// Returns true if the entry was written under the current format version.
    #[must_use]
    pub fn has_current_version(&self) -> bool {
        self.format_version == CACHE_FORMAT_VERSION
    }

    /// Returns true if the entry may be served at `now`.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.has_current_version() && self.age_at(now) <= MAX_AGE
    }

    /// Returns true if the entry may be served right now.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
