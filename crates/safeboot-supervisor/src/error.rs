//! Supervisor error types.

use thiserror::Error;

/// Errors returned by the health supervisor.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// Tick period or stale threshold is unusable.
    #[error("Invalid supervisor timing: {0}")]
    InvalidTiming(String),

    /// The tick thread could not be spawned.
    #[error("Failed to spawn supervisor thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;
