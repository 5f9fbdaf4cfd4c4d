//! Convenience re-exports for common test utilities.

pub use crate::must::{must, must_some, must_with, wait_until};

#[cfg(feature = "tracking")]
pub use crate::tracking::{AllocationGuard, TrackingAllocator, track};

#[cfg(feature = "doubles")]
pub use crate::doubles::{CountingHistory, RecordingRecovery, RecordingReset, RecordingWatchdog};

#[cfg(feature = "doubles")]
pub use safeboot_hardware_watchdog::WatchdogDriver;

/// Result type for tests that use `?`.
pub type TestResult = Result<(), Box<dyn std::error::Error>>;
