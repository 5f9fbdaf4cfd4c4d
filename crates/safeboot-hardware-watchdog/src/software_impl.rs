//! Software watchdog implementation.
//!
//! This module provides `SoftwareWatchdog`, an implementation of the
//! `WatchdogDriver` trait for host builds and tests. It tracks the deadline
//! against a monotonic clock but cannot reset the machine by itself; callers
//! poll `has_expired()` and act on it.

use portable_atomic::{AtomicU32, AtomicU64, Ordering};

use crate::config::WatchdogConfig;
use crate::error::{HardwareWatchdogError, HardwareWatchdogResult};
use crate::state::{WatchdogMetrics, WatchdogState, WatchdogStatus};
use crate::watchdog::WatchdogDriver;

/// Software watchdog.
///
/// All methods take `&self` and are lock-free, so one instance can be shared
/// between the boot path and the supervisor thread through an `Arc`.
///
/// Time is the sum of a monotonic clock (with the `std` feature) and a
/// manual offset added with `advance_us()`. Without `std` only the offset
/// moves, which lets an external timer drive the watchdog.
///
/// # Example
///
/// ```rust
/// use safeboot_hardware_watchdog::{SoftwareWatchdog, WatchdogDriver};
///
/// let watchdog = SoftwareWatchdog::default();
/// watchdog.init(100).expect("valid timeout");
///
/// watchdog.advance_us(50_000);
/// watchdog.feed().expect("fed before the deadline");
///
/// watchdog.advance_us(150_000);
/// assert!(watchdog.has_expired());
/// ```
#[derive(Debug)]
pub struct SoftwareWatchdog {
    config: WatchdogConfig,
    state: WatchdogState,
    timeout_ms: AtomicU32,
    last_feed_us: AtomicU64,
    offset_us: AtomicU64,
    max_feed_interval_us: AtomicU64,
    #[cfg(feature = "std")]
    origin: std::time::Instant,
}

impl SoftwareWatchdog {
    /// Create a disabled software watchdog.
    #[must_use]
    pub fn new(config: WatchdogConfig) -> Self {
        Self {
            config,
            state: WatchdogState::new(),
            timeout_ms: AtomicU32::new(0),
            last_feed_us: AtomicU64::new(0),
            offset_us: AtomicU64::new(0),
            max_feed_interval_us: AtomicU64::new(0),
            #[cfg(feature = "std")]
            origin: std::time::Instant::now(),
        }
    }

    /// Peripheral configuration.
    #[must_use]
    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Current state machine status.
    #[must_use]
    pub fn status(&self) -> WatchdogStatus {
        self.state.status()
    }

    /// Watchdog clock in microseconds.
    #[must_use]
    pub fn now_us(&self) -> u64 {
        let offset = self.offset_us.load(Ordering::Acquire);
        #[cfg(feature = "std")]
        {
            let elapsed = u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX);
            elapsed.saturating_add(offset)
        }
        #[cfg(not(feature = "std"))]
        {
            offset
        }
    }

    /// Move the watchdog clock forward.
    pub fn advance_us(&self, us: u64) {
        self.offset_us.fetch_add(us, Ordering::AcqRel);
    }

    /// Microseconds since the last feed, or `None` when disabled.
    #[must_use]
    pub fn time_since_last_feed_us(&self) -> Option<u64> {
        if self.state.status() == WatchdogStatus::Disabled {
            return None;
        }
        let last_feed = self.last_feed_us.load(Ordering::Acquire);
        Some(self.now_us().saturating_sub(last_feed))
    }

    /// Whether the deadline has passed.
    ///
    /// The first call that observes a missed deadline moves the state to
    /// `Expired`; every later call returns `true` until `reset()`.
    pub fn has_expired(&self) -> bool {
        match self.state.status() {
            WatchdogStatus::Expired => true,
            WatchdogStatus::Disabled => false,
            WatchdogStatus::Armed => {
                let timeout_us = u64::from(self.timeout_ms.load(Ordering::Acquire)) * 1000;
                let overdue = self
                    .time_since_last_feed_us()
                    .is_some_and(|since| since > timeout_us);
                if overdue && self.state.expire().is_err() {
                    // Another observer won the transition.
                    debug_assert_eq!(self.state.status(), WatchdogStatus::Expired);
                }
                overdue
            }
        }
    }

    /// Return to the disabled state, as after a device reset.
    pub fn reset(&self) {
        self.state.reset();
        self.timeout_ms.store(0, Ordering::Release);
        self.last_feed_us.store(0, Ordering::Release);
    }

    /// Snapshot of watchdog counters.
    #[must_use]
    pub fn metrics(&self) -> WatchdogMetrics {
        WatchdogMetrics::from_state(
            &self.state,
            self.max_feed_interval_us.load(Ordering::Acquire),
        )
    }

    fn reload(&self) {
        self.last_feed_us.store(self.now_us(), Ordering::Release);
    }

    fn ensure_armed(&self) -> HardwareWatchdogResult<()> {
        if self.has_expired() {
            return Err(HardwareWatchdogError::Expired);
        }
        match self.state.status() {
            WatchdogStatus::Armed => Ok(()),
            WatchdogStatus::Disabled => Err(HardwareWatchdogError::NotEnabled),
            WatchdogStatus::Expired => Err(HardwareWatchdogError::Expired),
        }
    }
}

impl WatchdogDriver for SoftwareWatchdog {
    fn init(&self, boot_timeout_ms: u32) -> HardwareWatchdogResult<()> {
        self.config.check_timeout(boot_timeout_ms)?;
        self.state.arm()?;
        self.timeout_ms.store(boot_timeout_ms, Ordering::Release);
        self.reload();
        Ok(())
    }

    fn feed(&self) -> HardwareWatchdogResult<()> {
        self.ensure_armed()?;
        self.state.feed()?;
        let now = self.now_us();
        let previous = self.last_feed_us.swap(now, Ordering::AcqRel);
        self.max_feed_interval_us
            .fetch_max(now.saturating_sub(previous), Ordering::AcqRel);
        Ok(())
    }

    fn retune(&self, timeout_ms: u32) -> HardwareWatchdogResult<()> {
        self.ensure_armed()?;
        if !self.config.allow_retune {
            return Err(HardwareWatchdogError::RetuneUnsupported);
        }
        self.config.check_timeout(timeout_ms)?;
        self.state.retune()?;
        self.timeout_ms.store(timeout_ms, Ordering::Release);
        self.reload();
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.state.status() != WatchdogStatus::Disabled
    }

    fn timeout_ms(&self) -> u32 {
        self.timeout_ms.load(Ordering::Acquire)
    }
}

impl Default for SoftwareWatchdog {
    fn default() -> Self {
        Self::new(WatchdogConfig::default())
    }
}
