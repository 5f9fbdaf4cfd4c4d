//! The health supervisor and its tick loop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use safeboot_diagnostics::{EventTag, evt};
use safeboot_fault_history::BootHistory;
use safeboot_hardware_watchdog::WatchdogDriver;
use safeboot_recovery::{RecoveryHandler, RecoveryReason};
use tracing::{debug, info, warn};

use crate::channel::{ChannelState, HealthChannel, MonitoredChannel};
use crate::config::{SupervisorConfig, SupervisorTiming};
use crate::error::SupervisorResult;

#[derive(Debug, Clone, Copy)]
struct Session {
    config: SupervisorConfig,
    started_at_ms: u64,
    retuned: bool,
}

struct Inner {
    epoch: Instant,
    timing: SupervisorTiming,
    led: HealthChannel,
    system: HealthChannel,
    session: Mutex<Option<Session>>,
    shutdown: Mutex<bool>,
    wake: Condvar,
    running: AtomicBool,
    feeds: AtomicU64,
    health_faults: AtomicU64,
    watchdog: Arc<dyn WatchdogDriver>,
    recovery: Arc<dyn RecoveryHandler>,
    history: Arc<dyn BootHistory>,
}

impl Inner {
    #[inline]
    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn first_stale(&self, now_ms: u64, led_monitored: bool) -> Option<&HealthChannel> {
        let monitored = [Some(&self.system), led_monitored.then_some(&self.led)];
        monitored
            .into_iter()
            .flatten()
            .find(|channel| channel.state(now_ms) == ChannelState::Stale)
    }

    fn tick(&self) {
        let now_ms = self.now_ms();
        let stale = {
            let mut guard = self.session.lock();
            let Some(session) = guard.as_mut() else {
                return;
            };
            let stale = self.first_stale(now_ms, session.config.led_monitoring_enabled);
            if stale.is_none() {
                self.feed();
                self.maybe_retune(now_ms, session);
            }
            stale
        };

        if let Some(channel) = stale {
            self.health_faults.fetch_add(1, Ordering::Relaxed);
            evt!(
                ERROR,
                EventTag::Watchdog,
                "HEALTH_STALE",
                channel = channel.kind(),
                age_ms = channel.age_ms(now_ms),
            );
            self.recovery.request(RecoveryReason::HealthFault);
        }
    }

    fn feed(&self) {
        match self.watchdog.feed() {
            Ok(()) => {
                self.feeds.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => warn!(error = %err, rc = err.code(), "Watchdog feed failed"),
        }
    }

    fn maybe_retune(&self, now_ms: u64, session: &mut Session) {
        if session.retuned || !self.watchdog.is_enabled() {
            return;
        }
        let elapsed = now_ms.saturating_sub(session.started_at_ms);
        if elapsed < u64::from(session.config.retune_delay_ms) {
            return;
        }
        session.retuned = true;

        let steady_ms = session.config.steady_timeout_ms;
        match self.watchdog.retune(steady_ms) {
            Ok(()) => {
                evt!(INFO, EventTag::Watchdog, "RETUNED", timeout_ms = steady_ms);
                match self.history.clear_watchdog_counter() {
                    Ok(()) => evt!(INFO, EventTag::Watchdog, "COUNTER_CLEARED"),
                    Err(err) => warn!(error = %err, "Failed to clear watchdog counter"),
                }
            }
            Err(err) => {
                evt!(WARN, EventTag::Watchdog, "RETUNE_FAIL", rc = err.code());
                warn!(
                    error = %err,
                    timeout_ms = self.watchdog.timeout_ms(),
                    "Watchdog retune failed, keeping boot timeout"
                );
            }
        }
    }

    fn run(&self) {
        debug!("Supervisor tick loop running");
        loop {
            self.tick();
            let mut shutdown = self.shutdown.lock();
            if !*shutdown {
                // Timeout or notification; both just end the wait.
                let _timed_out = self.wake.wait_for(&mut shutdown, self.timing.tick_period);
            }
            if *shutdown {
                break;
            }
        }
        debug!("Supervisor tick loop stopped");
    }
}

/// Point-in-time view of the supervisor for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSnapshot {
    /// Whether the tick loop is running.
    pub running: bool,
    /// Configuration of the current session.
    pub config: Option<SupervisorConfig>,
    /// Whether this session already attempted the retune.
    pub retuned: bool,
    /// Milliseconds since the LED channel was last notified.
    pub led_age_ms: u64,
    /// Milliseconds since the system channel was last notified.
    pub system_age_ms: u64,
    /// Successful feeds since construction.
    pub feed_count: u64,
    /// Ticks that found a stale channel since construction.
    pub health_fault_count: u64,
}

/// Background liveness monitor that feeds and retunes the watchdog.
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use safeboot_supervisor::prelude::*;
/// # fn demo(
/// #     watchdog: Arc<dyn safeboot_hardware_watchdog::WatchdogDriver>,
/// #     recovery: Arc<dyn safeboot_recovery::RecoveryHandler>,
/// #     history: Arc<dyn safeboot_fault_history::BootHistory>,
/// # ) -> SupervisorResult<()> {
/// let supervisor =
///     HealthSupervisor::new(watchdog, recovery, history, SupervisorTiming::default())?;
/// supervisor.start(SupervisorConfig {
///     steady_timeout_ms: 3000,
///     retune_delay_ms: 10_000,
///     led_monitoring_enabled: true,
/// })?;
///
/// // From the producer threads:
/// supervisor.notify_system_alive();
/// supervisor.notify_led_alive();
/// # Ok(())
/// # }
/// ```
pub struct HealthSupervisor {
    inner: Arc<Inner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for HealthSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthSupervisor")
            .field("timing", &self.inner.timing)
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl HealthSupervisor {
    /// Create a stopped supervisor.
    ///
    /// # Errors
    ///
    /// Returns an error if `timing` is invalid.
    pub fn new(
        watchdog: Arc<dyn WatchdogDriver>,
        recovery: Arc<dyn RecoveryHandler>,
        history: Arc<dyn BootHistory>,
        timing: SupervisorTiming,
    ) -> SupervisorResult<Self> {
        timing.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                epoch: Instant::now(),
                timing,
                led: HealthChannel::new(MonitoredChannel::Led, timing.led_stale),
                system: HealthChannel::new(MonitoredChannel::System, timing.system_stale),
                session: Mutex::new(None),
                shutdown: Mutex::new(false),
                wake: Condvar::new(),
                running: AtomicBool::new(false),
                feeds: AtomicU64::new(0),
                health_faults: AtomicU64::new(0),
                watchdog,
                recovery,
                history,
            }),
            worker: Mutex::new(None),
        })
    }

    /// Timing the supervisor was built with.
    pub fn timing(&self) -> SupervisorTiming {
        self.inner.timing
    }

    /// Begin a supervision session.
    ///
    /// Resets both channels to "alive now", clears the retune flag and
    /// installs `config`, then starts the tick thread unless it is already
    /// running. Calling it again restarts the session in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the tick thread could not be spawned.
    pub fn start(&self, config: SupervisorConfig) -> SupervisorResult<()> {
        let now_ms = self.inner.now_ms();
        {
            let mut session = self.inner.session.lock();
            self.inner.led.touch(now_ms);
            self.inner.system.touch(now_ms);
            *session = Some(Session {
                config,
                started_at_ms: now_ms,
                retuned: false,
            });
        }

        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!(?config, "Supervisor session restarted");
            return Ok(());
        }

        *self.inner.shutdown.lock() = false;
        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name("safeboot-supervisor".to_owned())
            .spawn(move || inner.run())?;
        *worker = Some(handle);
        self.inner.running.store(true, Ordering::Release);

        info!(
            steady_timeout_ms = config.steady_timeout_ms,
            retune_delay_ms = config.retune_delay_ms,
            led_monitoring = config.led_monitoring_enabled,
            tick_ms = u64::try_from(self.inner.timing.tick_period.as_millis()).unwrap_or(u64::MAX),
            "Health supervisor started"
        );
        Ok(())
    }

    /// Stop the tick thread and wait for it to exit.
    pub fn stop(&self) {
        let handle = self.worker.lock().take();
        {
            let mut shutdown = self.inner.shutdown.lock();
            *shutdown = true;
            self.inner.wake.notify_all();
        }
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Supervisor thread panicked");
            }
            info!("Health supervisor stopped");
        }
        self.inner.running.store(false, Ordering::Release);
    }

    /// Whether the tick thread is running.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Report LED task liveness. Lock-free and allocation-free.
    #[inline]
    pub fn notify_led_alive(&self) {
        self.inner.led.touch(self.inner.now_ms());
    }

    /// Report system task liveness. Lock-free and allocation-free.
    #[inline]
    pub fn notify_system_alive(&self) {
        self.inner.system.touch(self.inner.now_ms());
    }

    /// Request a reset with [`RecoveryReason::ManualTrigger`] right away,
    /// independent of the tick.
    pub fn request_manual_recovery(&self) {
        info!("Manual recovery requested");
        self.inner.recovery.request(RecoveryReason::ManualTrigger);
    }

    /// Current state for diagnostics.
    pub fn snapshot(&self) -> SupervisorSnapshot {
        let now_ms = self.inner.now_ms();
        let session = *self.inner.session.lock();
        SupervisorSnapshot {
            running: self.is_running(),
            config: session.map(|s| s.config),
            retuned: session.is_some_and(|s| s.retuned),
            led_age_ms: self.inner.led.age_ms(now_ms),
            system_age_ms: self.inner.system.age_ms(now_ms),
            feed_count: self.inner.feeds.load(Ordering::Relaxed),
            health_fault_count: self.inner.health_faults.load(Ordering::Relaxed),
        }
    }
}

impl Drop for HealthSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}
