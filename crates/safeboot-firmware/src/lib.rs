//! Device bring-up for safeboot.
//!
//! [`BootSequence`] wires the fault-recovery core together in the order the
//! device needs it: account for the boot in the fault history, decide on
//! fallback mode, start the recovery controller, arm the watchdog, and only
//! then start the liveness producers and the health supervisor.
//!
//! The [`platform`] module provides host stand-ins for the reset-cause
//! register, the status LED and the system reset so the firmware can run as
//! an ordinary process.

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]

pub mod boot;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod platform;
pub mod prelude;

pub use boot::{BootOutcome, BootSequence};
pub use config::AppConfig;
pub use error::{FirmwareError, FirmwareResult};
pub use heartbeat::{HeartbeatConfig, HeartbeatHandle, LivenessSink};
