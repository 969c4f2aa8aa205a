//! Error types for abx-client.

use thiserror::Error;

/// Main error type for all feed client operations.
#[derive(Debug, Error)]
pub enum FeedError {
    /// I/O error outside of connect/send (file output, socket reads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error while writing the output document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Could not establish a connection to the feed endpoint.
    ///
    /// This is the only fatal error of a run.
    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Write failure on an otherwise open connection.
    #[error("Send failed: {0}")]
    Send(#[source] std::io::Error),

    /// A frame did not have the exact expected size (short read, truncated buffer).
    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    /// A decoded packet violates a field invariant.
    #[error("Invalid packet: {0}")]
    Validation(String),

    /// Request frame carried a call type this protocol does not define.
    #[error("Unknown call type: {0}")]
    UnknownCallType(u8),

    /// Operation attempted on a session that is already closed.
    #[error("Connection closed")]
    ConnectionClosed,
}

impl FeedError {
    /// Whether this error must abort the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FeedError::Connect { .. })
    }
}

/// Result type alias using FeedError.
pub type Result<T> = std::result::Result<T, FeedError>;
