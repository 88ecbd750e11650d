//! Network fetch error types.

use thiserror::Error;

/// Fetch error variants.
///
/// `Clone` so a single in-flight fetch can hand its outcome to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum FetchError {
    #[error("request failed: {message}")]
    Request { message: String },

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("failed to read body: {message}")]
    Body { message: String },

    #[error("failed to create HTTP client: {message}")]
    Client { message: String },
}

impl FetchError {
    /// Creates request error.
    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// Creates non-success status error.
    #[must_use]
    pub fn status(status: u16, reason: impl Into<String>) -> Self {
        Self::Status {
            status,
            reason: reason.into(),
        }
    }

    /// Creates body read error.
    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body {
            message: message.into(),
        }
    }

    /// Creates client construction error.
    #[must_use]
    pub fn client(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
        }
    }
}
