//! Error types for the flightboard system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for flightboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the flightboard system
#[derive(Error, Debug)]
pub enum Error {
    /// Feed source errors (transport, status code, body decoding)
    #[error("Feed error: {0}")]
    Feed(String),

    /// Notification sink errors
    #[error("Notifier error: {0}")]
    Notifier(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single feed record carried data that could not be interpreted
    #[error("Invalid record {id}: {message}")]
    InvalidRecord {
        /// Feed identifier of the offending record
        id: i64,
        /// What was wrong with it
        message: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// An external call did not finish in time
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl Error {
    /// Create a feed error
    pub fn feed(msg: impl Into<String>) -> Self {
        Self::Feed(msg.into())
    }

    /// Create a notifier error
    pub fn notifier(msg: impl Into<String>) -> Self {
        Self::Notifier(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid record error
    pub fn invalid_record(id: i64, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            id,
            message: message.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Whether this error is scoped to one feed record
    pub fn is_record_scoped(&self) -> bool {
        matches!(self, Self::InvalidRecord { .. })
    }
}
