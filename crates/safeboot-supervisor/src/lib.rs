//! Liveness supervision for safeboot.
//!
//! [`HealthSupervisor`] runs a background tick that watches independent
//! liveness channels. While every monitored channel is fresh it feeds the
//! watchdog, and once the device has survived its boot window it retunes the
//! watchdog to the steady timeout and forgives the consecutive watchdog
//! streak. A stale channel escalates to the recovery controller with
//! `HealthFault`.
//!
//! Producers report liveness with [`HealthSupervisor::notify_led_alive`] and
//! [`HealthSupervisor::notify_system_alive`]. Both are a single atomic store
//! and never block or allocate.

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]

pub mod channel;
pub mod config;
pub mod error;
pub mod prelude;
pub mod supervisor;

pub use channel::{ChannelState, HealthChannel, MonitoredChannel};
pub use config::{SupervisorConfig, SupervisorTiming};
pub use error::{SupervisorError, SupervisorResult};
pub use supervisor::{HealthSupervisor, SupervisorSnapshot};
