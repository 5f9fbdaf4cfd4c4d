//! Recording implementations of the collaborator traits.
//!
//! Each double records every call so tests can assert on what the code
//! under test asked for, and can be told to fail.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use parking_lot::Mutex;
use safeboot_fault_history::{BootHistory, FaultHistoryError, FaultHistoryResult, StorageError};
use safeboot_hardware_watchdog::{HardwareWatchdogError, HardwareWatchdogResult, WatchdogDriver};
use safeboot_recovery::{RecoveryHandler, RecoveryReason, SystemReset};

/// Watchdog driver that records calls instead of touching hardware.
#[derive(Debug, Default)]
pub struct RecordingWatchdog {
    enabled: AtomicBool,
    timeout_ms: AtomicU32,
    feeds: AtomicUsize,
    inits: Mutex<Vec<u32>>,
    retunes: Mutex<Vec<u32>>,
    fail_init: AtomicBool,
    fail_retune: AtomicBool,
}

impl RecordingWatchdog {
    /// Disabled watchdog that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Watchdog already armed at `timeout_ms`.
    #[must_use]
    pub fn armed(timeout_ms: u32) -> Self {
        let watchdog = Self::default();
        watchdog.enabled.store(true, Ordering::SeqCst);
        watchdog.timeout_ms.store(timeout_ms, Ordering::SeqCst);
        watchdog
    }

    /// Make `init` fail.
    pub fn fail_init(&self, fail: bool) {
        self.fail_init.store(fail, Ordering::SeqCst);
    }

    /// Make `retune` fail.
    pub fn fail_retune(&self, fail: bool) {
        self.fail_retune.store(fail, Ordering::SeqCst);
    }

    /// Number of successful feeds.
    pub fn feed_count(&self) -> usize {
        self.feeds.load(Ordering::SeqCst)
    }

    /// Timeouts passed to `init`.
    pub fn inits(&self) -> Vec<u32> {
        self.inits.lock().clone()
    }

    /// Timeouts passed to `retune`, including failed attempts.
    pub fn retunes(&self) -> Vec<u32> {
        self.retunes.lock().clone()
    }
}

impl WatchdogDriver for RecordingWatchdog {
    fn init(&self, boot_timeout_ms: u32) -> HardwareWatchdogResult<()> {
        self.inits.lock().push(boot_timeout_ms);
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(HardwareWatchdogError::hardware_error("init rejected"));
        }
        self.enabled.store(true, Ordering::SeqCst);
        self.timeout_ms.store(boot_timeout_ms, Ordering::SeqCst);
        Ok(())
    }

    fn feed(&self) -> HardwareWatchdogResult<()> {
        if !self.enabled.load(Ordering::SeqCst) {
            return Err(HardwareWatchdogError::NotEnabled);
        }
        self.feeds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn retune(&self, timeout_ms: u32) -> HardwareWatchdogResult<()> {
        self.retunes.lock().push(timeout_ms);
        if self.fail_retune.load(Ordering::SeqCst) {
            return Err(HardwareWatchdogError::RetuneUnsupported);
        }
        self.timeout_ms.store(timeout_ms, Ordering::SeqCst);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn timeout_ms(&self) -> u32 {
        self.timeout_ms.load(Ordering::SeqCst)
    }
}

/// Recovery handler that records reasons without resetting anything.
#[derive(Debug, Default)]
pub struct RecordingRecovery {
    requests: Mutex<Vec<RecoveryReason>>,
}

impl RecordingRecovery {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request so far, in order.
    pub fn requests(&self) -> Vec<RecoveryReason> {
        self.requests.lock().clone()
    }

    /// Number of requests with `reason`.
    pub fn count(&self, reason: RecoveryReason) -> usize {
        self.requests.lock().iter().filter(|r| **r == reason).count()
    }
}

impl RecoveryHandler for RecordingRecovery {
    fn request(&self, reason: RecoveryReason) {
        self.requests.lock().push(reason);
    }
}

/// Boot history that counts counter clears.
#[derive(Debug, Default)]
pub struct CountingHistory {
    clears: AtomicUsize,
    fail: AtomicBool,
}

impl CountingHistory {
    /// Counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `clear_watchdog_counter` fail (the call is still counted).
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of `clear_watchdog_counter` calls.
    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl BootHistory for CountingHistory {
    fn clear_watchdog_counter(&self) -> FaultHistoryResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(FaultHistoryError::Storage(StorageError::Injected {
                operation: "write",
            }));
        }
        Ok(())
    }
}

/// Platform reset that records reasons and returns.
#[derive(Debug, Default)]
pub struct RecordingReset {
    resets: Mutex<Vec<RecoveryReason>>,
}

impl RecordingReset {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every reset so far, in order.
    pub fn resets(&self) -> Vec<RecoveryReason> {
        self.resets.lock().clone()
    }
}

impl SystemReset for RecordingReset {
    fn reset(&self, reason: RecoveryReason) {
        self.resets.lock().push(reason);
    }
}
