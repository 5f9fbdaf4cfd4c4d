//! # safeboot-hardware-watchdog
//!
//! Hardware watchdog abstraction for the safeboot fault-recovery core.
//!
//! This crate provides a `#![no_std]`-compatible watchdog layer with:
//! - `WatchdogDriver` trait, the seam between the recovery core and the
//!   watchdog peripheral
//! - `SoftwareWatchdog` for host builds, simulation and tests
//! - Lock-free state machine with deterministic transitions
//!
//! ## Contract
//!
//! Once armed with `init()`, the watchdog resets the device unconditionally if
//! `feed()` is not called within the currently armed timeout. This is the
//! backstop beneath all software recovery logic. `retune()` changes the armed
//! timeout after the boot window has been survived.
//!
//! ## State Machine
//!
//! ```text
//! Disabled ──init()──► Armed ──(no feed within timeout)──► Expired
//!     ▲                 │  ▲                                  │
//!     │                 └──┘ feed() / retune()                │
//!     └────────────────────────── reset() ────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use safeboot_hardware_watchdog::prelude::*;
//!
//! let watchdog = SoftwareWatchdog::default();
//!
//! // Arm with the long boot timeout, then tighten once stable.
//! watchdog.init(8000).expect("valid timeout");
//! watchdog.feed().expect("armed watchdog accepts feeds");
//! watchdog.retune(3000).expect("retune supported");
//!
//! assert!(watchdog.is_enabled());
//! assert_eq!(watchdog.timeout_ms(), 3000);
//! ```

#![no_std]
#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod config;
pub mod error;
pub mod prelude;
pub mod software_impl;
pub mod state;
pub mod watchdog;

pub use config::{MAX_TIMEOUT_MS, MIN_TIMEOUT_MS, WatchdogConfig, WatchdogConfigBuilder};
pub use error::{HardwareWatchdogError, HardwareWatchdogResult};
pub use software_impl::SoftwareWatchdog;
pub use state::{WatchdogMetrics, WatchdogState, WatchdogStatus};
pub use watchdog::WatchdogDriver;
