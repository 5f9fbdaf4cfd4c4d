//! Supervisor configuration.

use std::time::Duration;

use crate::error::{SupervisorError, SupervisorResult};

/// Per-`start()` configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Timeout the watchdog is retuned to after the boot window.
    pub steady_timeout_ms: u32,
    /// Time after `start()` before retuning; `0` retunes on the first tick.
    pub retune_delay_ms: u32,
    /// Whether the LED channel is monitored alongside the system channel.
    pub led_monitoring_enabled: bool,
}

/// Tick period and stale thresholds, fixed for the supervisor's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorTiming {
    /// Interval between ticks.
    pub tick_period: Duration,
    /// LED channel stale threshold.
    pub led_stale: Duration,
    /// System channel stale threshold.
    pub system_stale: Duration,
}

impl SupervisorTiming {
    /// Check that the tick can observe staleness before the threshold is
    /// long past.
    ///
    /// # Errors
    ///
    /// Returns an error if any duration is zero or a threshold is shorter
    /// than the tick period.
    pub fn validate(&self) -> SupervisorResult<()> {
        if self.tick_period.is_zero() {
            return Err(SupervisorError::InvalidTiming(
                "tick_period must be non-zero".to_owned(),
            ));
        }
        for (name, threshold) in [("led_stale", self.led_stale), ("system_stale", self.system_stale)] {
            if threshold < self.tick_period {
                return Err(SupervisorError::InvalidTiming(format!(
                    "{name} ({threshold:?}) is shorter than tick_period ({:?})",
                    self.tick_period
                )));
            }
        }
        Ok(())
    }
}

impl Default for SupervisorTiming {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(250),
            led_stale: Duration::from_millis(3000),
            system_stale: Duration::from_millis(3000),
        }
    }
}
