//! Ingestion Error Types

use thiserror::Error;

/// Reasons a measurement record is rejected at the ingestion boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    /// Block without a usable sensor id
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Timestamp that is neither epoch seconds nor RFC 3339
    #[error("Unparseable timestamp: {0}")]
    InvalidTimestamp(String),

    /// Record that does not match the measurement shape
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

/// Errors from a measurement source
#[derive(Debug, Error)]
pub enum SourceError {
    /// Connection, timeout or other transport failure
    #[error("Upstream request failed: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status
    #[error("Upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body is not a measurement payload
    #[error("Invalid upstream payload: {0}")]
    Payload(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Transport(err.to_string())
    }
}
