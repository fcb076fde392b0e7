//! Warehouse error types.

use std::io;
use thiserror::Error;

use crate::table::TableError;

/// Result type for warehouse operations.
pub type WarehouseResult<T> = Result<T, WarehouseError>;

/// Errors that can occur while executing a query.
#[derive(Error, Debug)]
pub enum WarehouseError {
    /// Failed to spawn the bridge process.
    #[error("failed to spawn bridge process: {0}")]
    SpawnFailed(#[source] io::Error),

    /// Failed to write to bridge stdin.
    #[error("failed to write to bridge: {0}")]
    WriteFailed(#[source] io::Error),

    /// Failed to read from bridge stdout.
    #[error("failed to read from bridge: {0}")]
    ReadFailed(#[source] io::Error),

    /// Failed to serialize request to JSON.
    #[error("failed to serialize request: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    /// Failed to deserialize response from JSON.
    #[error("failed to deserialize response: {0}")]
    DeserializeFailed(#[source] serde_json::Error),

    /// Request timed out waiting for response.
    #[error("query timed out after {0} seconds")]
    Timeout(u64),

    /// Bridge process exited unexpectedly.
    #[error("bridge process exited unexpectedly")]
    BridgeExited,

    /// Response channel was closed (internal error).
    #[error("response channel closed unexpectedly")]
    ChannelClosed,

    /// The bridge could not authenticate against the warehouse.
    #[error("warehouse authentication failed: {0}")]
    AuthFailed(String),

    /// The warehouse rejected the SQL.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Quota or rate limit exceeded.
    #[error("warehouse quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Method not found.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// Bridge returned another error response.
    #[error("warehouse error: {message} (code: {code})")]
    Remote { code: String, message: String },

    /// The result rows did not fit the declared columns.
    #[error("malformed result: {0}")]
    MalformedResult(#[from] TableError),
}

impl WarehouseError {
    /// Create a remote error from an error response.
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Check if this error indicates the bridge has exited.
    pub fn is_bridge_exited(&self) -> bool {
        matches!(self, Self::BridgeExited | Self::ChannelClosed)
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for WarehouseError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::ChannelClosed
    }
}
