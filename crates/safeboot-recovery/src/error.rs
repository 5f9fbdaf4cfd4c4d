//! Recovery error types.

use thiserror::Error;

/// Errors returned by the recovery controller.
#[derive(Error, Debug)]
pub enum RecoveryError {
    /// `start()` has not been called.
    #[error("Recovery controller not started")]
    NotStarted,

    /// The deferred reboot thread could not be spawned.
    #[error("Failed to spawn timer thread: {0}")]
    TimerSpawn(#[from] std::io::Error),
}

/// Result type for recovery operations.
pub type RecoveryResult<T> = Result<T, RecoveryError>;
