//! Recovery escalation for safeboot.
//!
//! [`RecoveryController`] is the single place a device reset is requested
//! from. Each request carries a [`RecoveryReason`] so the cause shows up in
//! the diagnostic log, and concurrent requests collapse into one reset.
//!
//! A device that boots into fallback mode also gets a safe-mode reboot
//! ceiling: [`RecoveryController::schedule_safe_mode_reboot`] forces a reset
//! after a fixed delay no matter what the rest of the system does.

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]

pub mod controller;
pub mod error;
pub mod prelude;
pub mod reason;
pub mod timer;

pub use controller::{DEFAULT_FLUSH_DELAY, RecoveryController, RecoveryHandler, SystemReset};
pub use error::{RecoveryError, RecoveryResult};
pub use reason::RecoveryReason;
