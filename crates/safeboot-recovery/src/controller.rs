//! The recovery controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use safeboot_diagnostics::{EventTag, evt};
use tracing::{debug, info, warn};

use crate::error::{RecoveryError, RecoveryResult};
use crate::reason::RecoveryReason;
use crate::timer::{self, TimerHandle};

/// Pause between logging a request and resetting, so the event line
/// reaches the log collector.
pub const DEFAULT_FLUSH_DELAY: Duration = Duration::from_millis(100);

/// Platform reset.
///
/// On a device `reset` never returns. Host and test implementations may
/// return; the controller treats the reset as done either way.
pub trait SystemReset: Send + Sync {
    /// Reset the device.
    fn reset(&self, reason: RecoveryReason);
}

/// Accepts recovery requests.
///
/// Implemented by [`RecoveryController`]; the health supervisor and boot
/// sequence depend on this trait rather than the concrete controller.
pub trait RecoveryHandler: Send + Sync {
    /// Request a device reset for `reason`.
    fn request(&self, reason: RecoveryReason);
}

struct Inner {
    started: AtomicBool,
    in_flight: AtomicBool,
    last_reason: Mutex<Option<RecoveryReason>>,
    /// Latest safe-mode reboot timer. Replacing it does not cancel the
    /// earlier one.
    safe_mode_timer: Mutex<Option<TimerHandle>>,
    flush_delay: Duration,
    reset: Arc<dyn SystemReset>,
}

impl Inner {
    fn request(&self, reason: RecoveryReason) {
        if !self.started.load(Ordering::Acquire) {
            warn!(%reason, "Recovery requested before controller start, ignoring");
            return;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(%reason, "Recovery already in flight");
            return;
        }

        *self.last_reason.lock() = Some(reason);
        evt!(ERROR, EventTag::Recovery, "REQUEST", reason = reason);

        if !self.flush_delay.is_zero() {
            thread::sleep(self.flush_delay);
        }
        self.reset.reset(reason);
    }
}

/// Single chokepoint for device resets.
///
/// Requests are ignored until [`start`](Self::start). The first accepted
/// request performs the reset; any request that arrives while a reset is in
/// flight returns without effect. Cloning yields another handle to the same
/// controller.
#[derive(Clone)]
pub struct RecoveryController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RecoveryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryController")
            .field("started", &self.is_started())
            .field("in_flight", &self.is_in_flight())
            .field("last_reason", &self.last_reason())
            .field("flush_delay", &self.inner.flush_delay)
            .finish_non_exhaustive()
    }
}

impl RecoveryController {
    /// Create a controller that resets through `reset`.
    pub fn new(reset: Arc<dyn SystemReset>) -> Self {
        Self::with_flush_delay(reset, DEFAULT_FLUSH_DELAY)
    }

    /// Create a controller with a custom pause before reset.
    pub fn with_flush_delay(reset: Arc<dyn SystemReset>, flush_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                started: AtomicBool::new(false),
                in_flight: AtomicBool::new(false),
                last_reason: Mutex::new(None),
                safe_mode_timer: Mutex::new(None),
                flush_delay,
                reset,
            }),
        }
    }

    /// Start accepting requests.
    pub fn start(&self) {
        if !self.inner.started.swap(true, Ordering::AcqRel) {
            info!("Recovery controller started");
        }
    }

    /// Whether [`start`](Self::start) has been called.
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    /// Request a device reset.
    ///
    /// Safe to call from any thread; exactly one reset sequence runs.
    pub fn request(&self, reason: RecoveryReason) {
        self.inner.request(reason);
    }

    /// Whether a reset has been accepted.
    pub fn is_in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Reason of the accepted reset, if any.
    pub fn last_reason(&self) -> Option<RecoveryReason> {
        *self.inner.last_reason.lock()
    }

    /// Whether the most recently scheduled safe-mode reboot has yet to fire.
    #[must_use]
    pub fn is_safe_mode_reboot_pending(&self) -> bool {
        self.inner
            .safe_mode_timer
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_fired())
    }

    /// Force a reset with [`RecoveryReason::SafeModeRebootTimeout`] after
    /// `delay_ms`. A delay of `0` does nothing.
    ///
    /// The scheduled reset cannot be cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::NotStarted`] before [`start`](Self::start),
    /// or an error if the timer thread could not be spawned.
    pub fn schedule_safe_mode_reboot(&self, delay_ms: u32) -> RecoveryResult<()> {
        if delay_ms == 0 {
            return Ok(());
        }
        if !self.is_started() {
            warn!(delay_ms, "Safe-mode reboot scheduled before controller start");
            return Err(RecoveryError::NotStarted);
        }

        let inner = Arc::clone(&self.inner);
        let handle = timer::schedule_once(
            "safeboot-safe-mode-reboot",
            Duration::from_millis(u64::from(delay_ms)),
            move || inner.request(RecoveryReason::SafeModeRebootTimeout),
        )?;
        *self.inner.safe_mode_timer.lock() = Some(handle);

        evt!(WARN, EventTag::SafeMode, "REBOOT_SCHEDULED", delay_ms = delay_ms);
        Ok(())
    }
}

impl RecoveryHandler for RecoveryController {
    fn request(&self, reason: RecoveryReason) {
        RecoveryController::request(self, reason);
    }
}
