//! Host process stand-ins for the reset hardware.
//!
//! A real reset never returns and runs no cleanup, so both the software
//! reset and the watchdog backstop end the process with `abort`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use safeboot_diagnostics::{EventTag, evt};
use safeboot_hardware_watchdog::{SoftwareWatchdog, WatchdogDriver};
use safeboot_recovery::{RecoveryReason, SystemReset};
use tracing::{error, warn};

use super::reset_cause::{FileResetCause, ResetCause};
use crate::error::FirmwareResult;

fn abort_process() {
    std::process::abort();
}

/// Software reset for a host process.
///
/// Latches [`ResetCause::SOFTWARE`] for the next boot, then terminates.
#[derive(Debug)]
pub struct HostSystemReset {
    register: FileResetCause,
    terminate: fn(),
}

impl HostSystemReset {
    /// Reset that aborts the process.
    #[must_use]
    pub fn new(register: FileResetCause) -> Self {
        Self::with_terminate(register, abort_process)
    }

    /// Reset with a custom termination step.
    #[must_use]
    pub fn with_terminate(register: FileResetCause, terminate: fn()) -> Self {
        Self {
            register,
            terminate,
        }
    }
}

impl SystemReset for HostSystemReset {
    fn reset(&self, reason: RecoveryReason) {
        if let Err(err) = self.register.record(ResetCause::SOFTWARE) {
            warn!(error = %err, "Failed to latch software reset cause");
        }
        error!(%reason, "System reset");
        (self.terminate)();
    }
}

/// Polls a [`SoftwareWatchdog`] and runs `on_expiry` once it expires,
/// standing in for the hardware reset a real watchdog performs.
#[derive(Debug)]
pub struct WatchdogExpiryMonitor {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<bool>>,
}

impl WatchdogExpiryMonitor {
    /// Start polling every `poll`.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread could not be spawned.
    pub fn spawn<F>(
        watchdog: Arc<SoftwareWatchdog>,
        poll: Duration,
        on_expiry: F,
    ) -> FirmwareResult<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("safeboot-watchdog-expiry".to_owned())
            .spawn(move || {
                while !thread_stop.load(Ordering::Acquire) {
                    if watchdog.has_expired() {
                        evt!(
                            ERROR,
                            EventTag::Watchdog,
                            "EXPIRED",
                            timeout_ms = watchdog.timeout_ms(),
                        );
                        on_expiry();
                        return true;
                    }
                    thread::sleep(poll);
                }
                false
            })?;
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Latch [`ResetCause::WATCHDOG`] in `register` and abort the process.
    pub fn hardware_reset(register: &FileResetCause) {
        if let Err(err) = register.record(ResetCause::WATCHDOG) {
            warn!(error = %err, "Failed to latch watchdog reset cause");
        }
        abort_process();
    }

    /// Stop polling. Returns whether an expiry was observed.
    pub fn stop(mut self) -> bool {
        self.stop.store(true, Ordering::Release);
        self.thread
            .take()
            .is_some_and(|thread| thread.join().unwrap_or(false))
    }
}

impl Drop for WatchdogExpiryMonitor {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}
