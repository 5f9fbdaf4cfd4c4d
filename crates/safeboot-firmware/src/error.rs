//! Firmware error types.

use safeboot_fault_history::FaultHistoryError;
use safeboot_supervisor::SupervisorError;
use thiserror::Error;

/// Errors raised while bringing up the device.
#[derive(Error, Debug)]
pub enum FirmwareError {
    /// Application configuration rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// IO error on a host resource.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Fault history failure.
    #[error("Fault history error: {0}")]
    History(#[from] FaultHistoryError),

    /// Supervisor failure.
    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    /// Status LED failure.
    #[error("LED error: {0}")]
    Led(String),
}

/// Result type for firmware operations.
pub type FirmwareResult<T> = Result<T, FirmwareError>;
