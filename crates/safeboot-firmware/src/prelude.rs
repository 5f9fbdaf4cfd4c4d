//! Commonly used firmware types.

pub use crate::boot::{BootOutcome, BootSequence};
pub use crate::config::AppConfig;
pub use crate::error::{FirmwareError, FirmwareResult};
pub use crate::heartbeat::{HeartbeatConfig, HeartbeatHandle, LivenessSink};
pub use crate::platform::{
    FileResetCause, HostSystemReset, LatchedResetCause, LoggingLed, ResetCause,
    ResetCauseRegister, StatusLed, WatchdogExpiryMonitor,
};
