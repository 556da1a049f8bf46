//! Error types for the queue protocol.

use thiserror::Error;

use crate::types::JobId;

/// Errors that can occur while talking to the queue store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is unreachable or the connection failed mid-operation.
    #[error("queue store unreachable: {0}")]
    Connection(#[from] redis::RedisError),
}

/// Errors surfaced by the task queue client.
///
/// `ResultTimeout` is deliberately distinct from `Store`: a caller awaiting a
/// specific correlated result has no fallback branch on an empty return, so
/// the timeout must be an exceptional, loggable condition rather than a
/// `None`.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Connectivity failure of the underlying store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A record could not be serialized for the wire.
    #[error("failed to serialize queue record: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A record read back from the store could not be deserialized.
    #[error("failed to deserialize queue record: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// No result arrived for the job within the wait window.
    #[error("timed out waiting for result of job {job_id}")]
    ResultTimeout { job_id: JobId },
}

impl QueueError {
    /// Returns true if this is the result-wait timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueueError::ResultTimeout { .. })
    }
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
