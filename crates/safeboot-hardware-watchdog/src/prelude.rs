//! Prelude for safeboot-hardware-watchdog.
//!
//! ```rust
//! use safeboot_hardware_watchdog::prelude::*;
//!
//! let watchdog = SoftwareWatchdog::default();
//! watchdog.init(8000).expect("valid timeout");
//! watchdog.feed().expect("armed");
//! ```

pub use crate::config::{MAX_TIMEOUT_MS, MIN_TIMEOUT_MS, WatchdogConfig, WatchdogConfigBuilder};
pub use crate::error::{HardwareWatchdogError, HardwareWatchdogResult};
pub use crate::software_impl::SoftwareWatchdog;
pub use crate::state::{WatchdogMetrics, WatchdogState, WatchdogStatus};
pub use crate::watchdog::WatchdogDriver;
