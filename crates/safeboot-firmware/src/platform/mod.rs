//! Platform collaborators and their host implementations.

pub mod host;
pub mod led;
pub mod reset_cause;

pub use host::{HostSystemReset, WatchdogExpiryMonitor};
pub use led::{LoggingLed, StatusLed};
pub use reset_cause::{
    FileResetCause, LatchedResetCause, ResetCause, ResetCauseRegister, log_reset_cause,
};
