//! Watchdog driver trait definition.
//!
//! This module provides the `WatchdogDriver` trait, the boundary between the
//! recovery core and the watchdog peripheral.

use crate::error::HardwareWatchdogResult;

/// Watchdog peripheral driver.
///
/// If `feed()` is not called within the currently armed timeout, the hardware
/// resets the device unconditionally. Nothing in software can revoke that once
/// the watchdog is armed, which makes it the backstop beneath all recovery
/// logic.
///
/// Methods take `&self`: the driver is shared between the boot sequence,
/// which arms it, and the supervisor task, which feeds and retunes it.
/// Implementations synchronize internally.
///
/// # Implementation Requirements
///
/// 1. `init()` arms the watchdog exactly once; a second call fails.
/// 2. `feed()` must not block; it is called from the supervisor tick.
/// 3. `retune()` reloads the counter with the new timeout or fails without
///    changing the armed timeout.
pub trait WatchdogDriver: Send + Sync {
    /// Arm the watchdog with the boot timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout is invalid, the watchdog is already
    /// armed, or the peripheral could not be configured.
    fn init(&self, boot_timeout_ms: u32) -> HardwareWatchdogResult<()>;

    /// Reload the watchdog counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the watchdog is not armed or already expired.
    fn feed(&self) -> HardwareWatchdogResult<()>;

    /// Change the armed timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the watchdog is not armed, the timeout is invalid,
    /// or the peripheral does not support changing it.
    fn retune(&self, timeout_ms: u32) -> HardwareWatchdogResult<()>;

    /// Whether the watchdog is armed.
    fn is_enabled(&self) -> bool;

    /// Currently armed timeout in milliseconds (0 when disabled).
    fn timeout_ms(&self) -> u32;
}

impl<T: WatchdogDriver + ?Sized> WatchdogDriver for alloc::sync::Arc<T> {
    fn init(&self, boot_timeout_ms: u32) -> HardwareWatchdogResult<()> {
        (**self).init(boot_timeout_ms)
    }

    fn feed(&self) -> HardwareWatchdogResult<()> {
        (**self).feed()
    }

    fn retune(&self, timeout_ms: u32) -> HardwareWatchdogResult<()> {
        (**self).retune(timeout_ms)
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn timeout_ms(&self) -> u32 {
        (**self).timeout_ms()
    }
}
