//! Storage error types.

use thiserror::Error;

/// Errors raised by the connection lifecycle and the document store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Establishing the connection failed.
    #[error("database connection failed: {0}")]
    Connect(String),

    /// The liveness ping failed. Handled internally by reconnecting.
    #[error("database liveness probe failed: {0}")]
    ProbeFailure(String),

    /// Every connect attempt in the retry budget failed.
    #[error("gave up connecting to the database after {attempts} attempts: {last_error}")]
    ConnectionExhausted { attempts: u32, last_error: String },

    /// The manager was shut down while a connect attempt was in flight.
    #[error("connection manager was shut down")]
    ShutDown,

    /// The manager was dropped while a caller waited for readiness.
    #[error("connection manager is closed")]
    Closed,

    #[error("database query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("stored document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Whether the error means the database is unreachable right now, as
    /// opposed to a bad query or document.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StorageError::Connect(_)
                | StorageError::ProbeFailure(_)
                | StorageError::ConnectionExhausted { .. }
                | StorageError::ShutDown
                | StorageError::Closed
        )
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
