//! Application configuration.
//!
//! Every knob has a firmware default; a JSON file only needs the keys it
//! changes.

use std::path::Path;
use std::time::Duration;

use safeboot_hardware_watchdog::config::validate_timeout;
use safeboot_supervisor::SupervisorTiming;
use serde::{Deserialize, Serialize};

use crate::error::{FirmwareError, FirmwareResult};
use crate::heartbeat::HeartbeatConfig;

/// Timeouts and periods for the device, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Watchdog timeout armed at boot.
    pub boot_timeout_ms: u32,
    /// Watchdog timeout after the boot window, unless overridden in the
    /// fault history.
    pub steady_timeout_ms: u32,
    /// Time after supervisor start before retuning to the steady timeout.
    pub retune_delay_ms: u32,
    /// Forced reboot ceiling while in fallback mode.
    pub safe_mode_reboot_delay_ms: u32,
    /// Supervisor tick period.
    pub supervisor_tick_ms: u32,
    /// LED channel stale threshold.
    pub led_stale_ms: u32,
    /// System channel stale threshold.
    pub system_stale_ms: u32,
    /// LED toggle period in normal mode.
    pub led_period_ms: u32,
    /// LED toggle period in fallback mode.
    pub led_period_fallback_ms: u32,
    /// System heartbeat period.
    pub heartbeat_period_ms: u32,
    /// Pause after an LED toggle failure before retrying.
    pub led_retry_delay_ms: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            boot_timeout_ms: 8000,
            steady_timeout_ms: 3000,
            retune_delay_ms: 10_000,
            safe_mode_reboot_delay_ms: 300_000,
            supervisor_tick_ms: 250,
            led_stale_ms: 3000,
            system_stale_ms: 3000,
            led_period_ms: 500,
            led_period_fallback_ms: 1000,
            heartbeat_period_ms: 1000,
            led_retry_delay_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load a configuration file and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails
    /// validation.
    pub fn from_json_file(path: &Path) -> FirmwareResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values describe a device that can stay alive.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(&self) -> FirmwareResult<()> {
        let invalid = |msg: String| Err(FirmwareError::InvalidConfiguration(msg));

        for (name, value) in [
            ("boot_timeout_ms", self.boot_timeout_ms),
            ("steady_timeout_ms", self.steady_timeout_ms),
        ] {
            if validate_timeout(value).is_err() {
                return invalid(format!("{name} = {value} is outside the watchdog range"));
            }
        }
        for (name, value) in [
            ("supervisor_tick_ms", self.supervisor_tick_ms),
            ("led_period_ms", self.led_period_ms),
            ("led_period_fallback_ms", self.led_period_fallback_ms),
            ("heartbeat_period_ms", self.heartbeat_period_ms),
            ("led_retry_delay_ms", self.led_retry_delay_ms),
        ] {
            if value == 0 {
                return invalid(format!("{name} must be non-zero"));
            }
        }
        for (name, value) in [
            ("led_stale_ms", self.led_stale_ms),
            ("system_stale_ms", self.system_stale_ms),
        ] {
            if value < self.supervisor_tick_ms {
                return invalid(format!(
                    "{name} = {value} is shorter than supervisor_tick_ms"
                ));
            }
        }
        if self.led_period_fallback_ms >= self.led_stale_ms
            || self.led_period_ms >= self.led_stale_ms
        {
            return invalid("LED period must be shorter than led_stale_ms".to_owned());
        }
        if self.heartbeat_period_ms >= self.system_stale_ms {
            return invalid("heartbeat_period_ms must be shorter than system_stale_ms".to_owned());
        }
        Ok(())
    }

    /// Supervisor tick and thresholds.
    #[must_use]
    pub fn supervisor_timing(&self) -> SupervisorTiming {
        SupervisorTiming {
            tick_period: ms(self.supervisor_tick_ms),
            led_stale: ms(self.led_stale_ms),
            system_stale: ms(self.system_stale_ms),
        }
    }

    /// Heartbeat producer settings for the chosen mode.
    #[must_use]
    pub fn heartbeat_config(&self, fallback: bool) -> HeartbeatConfig {
        HeartbeatConfig {
            led_period: ms(if fallback {
                self.led_period_fallback_ms
            } else {
                self.led_period_ms
            }),
            heartbeat_period: ms(self.heartbeat_period_ms),
            retry_delay: ms(self.led_retry_delay_ms),
            fallback,
        }
    }
}

fn ms(value: u32) -> Duration {
    Duration::from_millis(u64::from(value))
}
