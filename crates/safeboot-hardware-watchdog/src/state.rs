//! Watchdog state machine and metrics.
//!
//! This module provides the state machine for watchdog management with
//! deterministic, atomic state transitions.

use portable_atomic::{AtomicU32, AtomicU64, Ordering};

use crate::error::HardwareWatchdogError;

/// Watchdog operational status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum WatchdogStatus {
    /// Watchdog has not been armed.
    #[default]
    Disabled = 0,
    /// Watchdog is armed and counting down.
    Armed = 1,
    /// Deadline passed without a feed (terminal until `reset()`).
    Expired = 2,
}

impl WatchdogStatus {
    /// Convert from raw u32 value.
    #[must_use]
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Disabled),
            1 => Some(Self::Armed),
            2 => Some(Self::Expired),
            _ => None,
        }
    }

    /// Convert to raw u32 value.
    #[must_use]
    pub fn to_raw(self) -> u32 {
        self as u32
    }

    /// Get the status as a string slice.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "Disabled",
            Self::Armed => "Armed",
            Self::Expired => "Expired",
        }
    }
}

impl core::fmt::Display for WatchdogStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Atomic watchdog state.
///
/// All operations are lock-free and safe to call from any thread.
///
/// ```text
/// Disabled ──arm()──► Armed ──expire()──► Expired
///     ▲                 │                    │
///     └──── reset() ────┴────────────────────┘
/// ```
#[derive(Debug)]
pub struct WatchdogState {
    status: AtomicU32,
    arm_count: AtomicU32,
    feed_count: AtomicU64,
    retune_count: AtomicU32,
    expiry_count: AtomicU32,
}

impl WatchdogState {
    /// Create a new watchdog state in the `Disabled` status.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: AtomicU32::new(WatchdogStatus::Disabled.to_raw()),
            arm_count: AtomicU32::new(0),
            feed_count: AtomicU64::new(0),
            retune_count: AtomicU32::new(0),
            expiry_count: AtomicU32::new(0),
        }
    }

    /// Get the current status.
    #[must_use]
    pub fn status(&self) -> WatchdogStatus {
        let raw = self.status.load(Ordering::Acquire);
        WatchdogStatus::from_raw(raw).unwrap_or(WatchdogStatus::Disabled)
    }

    fn transition(
        &self,
        from: WatchdogStatus,
        to: WatchdogStatus,
    ) -> Result<(), HardwareWatchdogError> {
        self.status
            .compare_exchange(from.to_raw(), to.to_raw(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|current| {
                let current = WatchdogStatus::from_raw(current).unwrap_or_default();
                HardwareWatchdogError::invalid_transition(current.as_str(), to.as_str())
            })
    }

    /// Transition from `Disabled` to `Armed`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyEnabled` if armed, or an invalid transition otherwise.
    pub fn arm(&self) -> Result<(), HardwareWatchdogError> {
        match self.transition(WatchdogStatus::Disabled, WatchdogStatus::Armed) {
            Ok(()) => {
                self.arm_count.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(_) if self.status() == WatchdogStatus::Armed => {
                Err(HardwareWatchdogError::AlreadyEnabled)
            }
            Err(err) => Err(err),
        }
    }

    /// Record a feed (`Armed` only).
    ///
    /// # Errors
    ///
    /// Returns an error if the current state is not `Armed`.
    pub fn feed(&self) -> Result<(), HardwareWatchdogError> {
        self.check_armed()?;
        self.feed_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Record a timeout change (`Armed` only).
    ///
    /// # Errors
    ///
    /// Returns an error if the current state is not `Armed`.
    pub fn retune(&self) -> Result<(), HardwareWatchdogError> {
        self.check_armed()?;
        self.retune_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn check_armed(&self) -> Result<(), HardwareWatchdogError> {
        match self.status() {
            WatchdogStatus::Armed => Ok(()),
            WatchdogStatus::Disabled => Err(HardwareWatchdogError::NotEnabled),
            WatchdogStatus::Expired => Err(HardwareWatchdogError::Expired),
        }
    }

    /// Transition from `Armed` to `Expired`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current state is not `Armed`.
    pub fn expire(&self) -> Result<(), HardwareWatchdogError> {
        self.transition(WatchdogStatus::Armed, WatchdogStatus::Expired)?;
        self.expiry_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Return to `Disabled`.
    pub fn reset(&self) {
        self.status
            .store(WatchdogStatus::Disabled.to_raw(), Ordering::Release);
    }

    /// Number of times armed.
    #[must_use]
    pub fn arm_count(&self) -> u32 {
        self.arm_count.load(Ordering::Acquire)
    }

    /// Number of accepted feeds.
    #[must_use]
    pub fn feed_count(&self) -> u64 {
        self.feed_count.load(Ordering::Acquire)
    }

    /// Number of accepted timeout changes.
    #[must_use]
    pub fn retune_count(&self) -> u32 {
        self.retune_count.load(Ordering::Acquire)
    }

    /// Number of expiries.
    #[must_use]
    pub fn expiry_count(&self) -> u32 {
        self.expiry_count.load(Ordering::Acquire)
    }
}

impl Default for WatchdogState {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of watchdog counters for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchdogMetrics {
    /// Total number of accepted feeds.
    pub feed_count: u64,
    /// Total number of arm operations.
    pub arm_count: u32,
    /// Total number of accepted timeout changes.
    pub retune_count: u32,
    /// Total number of expiries.
    pub expiry_count: u32,
    /// Longest observed interval between feeds, in microseconds.
    pub max_feed_interval_us: u64,
}

impl WatchdogMetrics {
    /// Build a snapshot from the state counters.
    #[must_use]
    pub fn from_state(state: &WatchdogState, max_feed_interval_us: u64) -> Self {
        Self {
            feed_count: state.feed_count(),
            arm_count: state.arm_count(),
            retune_count: state.retune_count(),
            expiry_count: state.expiry_count(),
            max_feed_interval_us,
        }
    }
}
