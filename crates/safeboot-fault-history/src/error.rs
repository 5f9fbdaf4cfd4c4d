//! Error types for fault-history persistence.

use thiserror::Error;

/// Errors raised by a [`RecordStorage`](crate::RecordStorage) backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error on the backing medium.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Fault injected by a simulated medium.
    #[error("Injected {operation} failure")]
    Injected {
        /// Operation that failed (`read` or `write`).
        operation: &'static str,
    },

    /// Key cannot be mapped onto the medium.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Errors returned by [`FaultHistoryStore`](crate::FaultHistoryStore).
#[derive(Error, Debug)]
pub enum FaultHistoryError {
    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Stored bytes are not a valid record.
    #[error("Corrupt fault record: {0}")]
    Corrupt(String),
}

/// Result type for fault-history operations.
pub type FaultHistoryResult<T> = Result<T, FaultHistoryError>;

impl FaultHistoryError {
    /// Whether this error came from the backing medium rather than its contents.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
