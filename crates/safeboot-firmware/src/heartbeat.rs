//! Status LED heartbeat task.
//!
//! The task blinks the status LED and doubles as the liveness producer:
//! each successful toggle reports the LED channel alive, and every
//! heartbeat period it reports the system channel alive.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use safeboot_diagnostics::{EventTag, evt};
use safeboot_supervisor::HealthSupervisor;
use tracing::{debug, error, warn};

use crate::error::FirmwareResult;
use crate::platform::StatusLed;

/// Heartbeats between `EVT,HEARTBEAT,OK` lines.
const HEARTBEAT_LOG_INTERVAL: u64 = 10;

/// Receiver of liveness notifications.
pub trait LivenessSink: Send + Sync {
    /// The LED task toggled the LED.
    fn notify_led_alive(&self);
    /// The system task is making progress.
    fn notify_system_alive(&self);
}

impl LivenessSink for HealthSupervisor {
    fn notify_led_alive(&self) {
        HealthSupervisor::notify_led_alive(self);
    }

    fn notify_system_alive(&self) {
        HealthSupervisor::notify_system_alive(self);
    }
}

/// Heartbeat task settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between LED toggles.
    pub led_period: Duration,
    /// Interval between system liveness reports.
    pub heartbeat_period: Duration,
    /// Pause after a failed toggle.
    pub retry_delay: Duration,
    /// Whether the device booted into fallback mode.
    pub fallback: bool,
}

#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    /// Sleep for `period` or until stopped. Returns `true` once stopped.
    fn sleep(&self, period: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            let _timed_out = self.wake.wait_for(&mut stopped, period);
        }
        *stopped
    }

    fn stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }
}

/// Handle to the running heartbeat task.
#[derive(Debug)]
pub struct HeartbeatHandle {
    signal: Arc<StopSignal>,
    thread: Option<JoinHandle<u64>>,
}

impl HeartbeatHandle {
    /// Start the heartbeat task on its own thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread could not be spawned.
    pub fn spawn(
        led: Box<dyn StatusLed>,
        sink: Arc<dyn LivenessSink>,
        config: HeartbeatConfig,
    ) -> FirmwareResult<Self> {
        let signal = Arc::new(StopSignal::default());
        let task_signal = Arc::clone(&signal);
        let thread = thread::Builder::new()
            .name("safeboot-heartbeat".to_owned())
            .spawn(move || run(led, sink.as_ref(), config, &task_signal))?;
        Ok(Self {
            signal,
            thread: Some(thread),
        })
    }

    /// Stop the task, as if it had hung, and wait for it. Returns the number
    /// of system heartbeats it produced.
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.signal.stop();
        match self.thread.take().map(JoinHandle::join) {
            Some(Ok(count)) => count,
            Some(Err(_)) => {
                warn!("Heartbeat thread panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    mut led: Box<dyn StatusLed>,
    sink: &dyn LivenessSink,
    config: HeartbeatConfig,
    signal: &StopSignal,
) -> u64 {
    if let Err(err) = led.configure() {
        error!(error = %err, "Status LED configuration failed, heartbeat task exiting");
        return 0;
    }
    if config.fallback {
        evt!(WARN, EventTag::SafeMode, "LED_SLOW_BLINK");
    }
    debug!(?config, "Heartbeat task running");

    let mut since_heartbeat = Duration::ZERO;
    let mut heartbeats: u64 = 0;
    loop {
        let waited = match led.toggle() {
            Ok(_) => {
                sink.notify_led_alive();
                config.led_period
            }
            Err(err) => {
                warn!(error = %err, "Status LED toggle failed, retrying");
                config.retry_delay
            }
        };
        if signal.sleep(waited) {
            return heartbeats;
        }

        if heartbeat_due(&mut since_heartbeat, waited, config.heartbeat_period) {
            sink.notify_system_alive();
            heartbeats += 1;
            if heartbeats % HEARTBEAT_LOG_INTERVAL == 0 {
                evt!(INFO, EventTag::Heartbeat, "OK", count = heartbeats);
            }
        }
    }
}

/// Accumulate `waited` and report whether a heartbeat is due. The overshoot
/// past `period` carries into the next interval.
fn heartbeat_due(since: &mut Duration, waited: Duration, period: Duration) -> bool {
    *since = since.saturating_add(waited);
    if *since < period {
        return false;
    }
    *since = since.saturating_sub(period);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FirmwareError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        led: AtomicUsize,
        system: AtomicUsize,
    }

    impl LivenessSink for CountingSink {
        fn notify_led_alive(&self) {
            self.led.fetch_add(1, Ordering::SeqCst);
        }

        fn notify_system_alive(&self) {
            self.system.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Debug)]
    struct BrokenLed {
        configure_ok: bool,
    }

    impl StatusLed for BrokenLed {
        fn configure(&mut self) -> FirmwareResult<()> {
            if self.configure_ok {
                Ok(())
            } else {
                Err(FirmwareError::Led("no such pin".to_owned()))
            }
        }

        fn toggle(&mut self) -> FirmwareResult<bool> {
            Err(FirmwareError::Led("stuck".to_owned()))
        }
    }

    fn fast(fallback: bool) -> HeartbeatConfig {
        HeartbeatConfig {
            led_period: Duration::from_millis(5),
            heartbeat_period: Duration::from_millis(10),
            retry_delay: Duration::from_millis(5),
            fallback,
        }
    }

    #[test]
    fn test_toggle_failure_keeps_system_alive() -> FirmwareResult<()> {
        let sink = Arc::new(CountingSink::default());
        let handle = HeartbeatHandle::spawn(
            Box::new(BrokenLed { configure_ok: true }),
            sink.clone(),
            fast(false),
        )?;
        thread::sleep(Duration::from_millis(100));
        let heartbeats = handle.stop();

        assert_eq!(sink.led.load(Ordering::SeqCst), 0);
        assert!(heartbeats >= 2);
        assert_eq!(sink.system.load(Ordering::SeqCst) as u64, heartbeats);
        Ok(())
    }

    #[test]
    fn test_heartbeat_due_carries_overshoot() {
        let period = Duration::from_millis(40);
        let waited = Duration::from_millis(30);
        let mut since = Duration::ZERO;

        let due: Vec<bool> = (0..4)
            .map(|_| heartbeat_due(&mut since, waited, period))
            .collect();

        assert_eq!(due, vec![false, true, true, true]);
        assert_eq!(since, Duration::ZERO);
    }

    #[test]
    fn test_configure_failure_ends_task() -> FirmwareResult<()> {
        let sink = Arc::new(CountingSink::default());
        let handle = HeartbeatHandle::spawn(
            Box::new(BrokenLed {
                configure_ok: false,
            }),
            sink.clone(),
            fast(false),
        )?;
        thread::sleep(Duration::from_millis(30));
        assert_eq!(handle.stop(), 0);
        assert_eq!(sink.system.load(Ordering::SeqCst), 0);
        Ok(())
    }
}
