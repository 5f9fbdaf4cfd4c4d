//! Configuration types for the hardware watchdog.

use crate::error::{HardwareWatchdogError, HardwareWatchdogResult};

/// Shortest timeout the peripheral can be armed with.
pub const MIN_TIMEOUT_MS: u32 = 1;

/// Longest timeout the peripheral can be armed with (independent watchdog,
/// 12-bit reload at the slowest prescaler).
pub const MAX_TIMEOUT_MS: u32 = 32_768;

/// Validate a timeout against the peripheral range.
///
/// # Errors
///
/// Returns an error if `timeout_ms` is outside `MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS`.
pub fn validate_timeout(timeout_ms: u32) -> HardwareWatchdogResult<()> {
    if (MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&timeout_ms) {
        Ok(())
    } else {
        Err(HardwareWatchdogError::invalid_configuration(
            "timeout_ms must be between 1 and 32768",
        ))
    }
}

/// Static properties of a watchdog peripheral.
///
/// The armed timeout itself is not part of the configuration: it is chosen
/// at `init()` and may change with `retune()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Whether the timeout can be changed after the watchdog is armed.
    ///
    /// Some peripherals latch their reload value on first start; retuning
    /// them fails and the device stays at the boot timeout.
    pub allow_retune: bool,

    /// Upper bound accepted by `init()` and `retune()`, in milliseconds.
    ///
    /// Clamped to `MAX_TIMEOUT_MS`; lower it to model slower peripherals.
    pub max_timeout_ms: u32,
}

impl WatchdogConfig {
    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> WatchdogConfigBuilder {
        WatchdogConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_timeout_ms` is outside the peripheral range.
    pub fn validate(&self) -> HardwareWatchdogResult<()> {
        validate_timeout(self.max_timeout_ms)
    }

    /// Check a requested timeout against this peripheral.
    ///
    /// # Errors
    ///
    /// Returns an error if `timeout_ms` is zero or above `max_timeout_ms`.
    pub fn check_timeout(&self, timeout_ms: u32) -> HardwareWatchdogResult<()> {
        validate_timeout(timeout_ms)?;
        if timeout_ms > self.max_timeout_ms {
            return Err(HardwareWatchdogError::invalid_configuration(
                "timeout_ms exceeds the peripheral maximum",
            ));
        }
        Ok(())
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            allow_retune: true,
            max_timeout_ms: MAX_TIMEOUT_MS,
        }
    }
}

/// Builder for `WatchdogConfig`.
#[derive(Debug, Default)]
pub struct WatchdogConfigBuilder {
    config: WatchdogConfig,
}

impl WatchdogConfigBuilder {
    /// Allow or forbid timeout changes after arming.
    #[must_use]
    pub fn allow_retune(mut self, allow: bool) -> Self {
        self.config.allow_retune = allow;
        self
    }

    /// Set the largest accepted timeout in milliseconds.
    #[must_use]
    pub fn max_timeout_ms(mut self, ms: u32) -> Self {
        self.config.max_timeout_ms = ms;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> HardwareWatchdogResult<WatchdogConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
