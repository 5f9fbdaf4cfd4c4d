//! Boot sequence tests against recording doubles and simulated flash.

use std::sync::Arc;
use std::time::Duration;

use safeboot_fault_history::{FaultHistoryStore, MemoryStorage};
use safeboot_firmware::platform::{LatchedResetCause, LoggingLed, ResetCause, ResetCauseRegister};
use safeboot_firmware::{AppConfig, BootOutcome, BootSequence, FirmwareResult};
use safeboot_recovery::{RecoveryController, RecoveryReason};
use safeboot_test_helpers::prelude::*;
use tracing_test::traced_test;

/// Settings that keep the background tasks quick in tests.
fn fast_config() -> AppConfig {
    AppConfig {
        supervisor_tick_ms: 10,
        led_stale_ms: 300,
        system_stale_ms: 300,
        led_period_ms: 20,
        led_period_fallback_ms: 40,
        heartbeat_period_ms: 40,
        led_retry_delay_ms: 20,
        ..AppConfig::default()
    }
}

/// Device whose flash, reset register and watchdog survive across boots.
struct Device {
    flash: MemoryStorage,
    register: Arc<LatchedResetCause>,
    watchdog: Arc<RecordingWatchdog>,
    reset: Arc<RecordingReset>,
}

impl Device {
    fn new(cause: ResetCause) -> Self {
        Self {
            flash: MemoryStorage::new(),
            register: Arc::new(LatchedResetCause::new(cause)),
            watchdog: Arc::new(RecordingWatchdog::new()),
            reset: Arc::new(RecordingReset::new()),
        }
    }

    fn history(&self) -> Arc<FaultHistoryStore> {
        Arc::new(FaultHistoryStore::new(self.flash.clone()))
    }

    fn boot(&self, config: AppConfig) -> FirmwareResult<BootOutcome> {
        let recovery = RecoveryController::with_flush_delay(self.reset.clone(), Duration::ZERO);
        BootSequence::new(
            config,
            self.history(),
            self.register.clone(),
            recovery,
            self.watchdog.clone(),
            Box::new(LoggingLed::new()),
        )
        .run()
    }

    /// Boot after the watchdog bit was latched.
    fn watchdog_boot(&self, config: AppConfig) -> FirmwareResult<BootOutcome> {
        self.register.latch(ResetCause::WATCHDOG);
        self.boot(config)
    }
}

#[test]
fn power_on_boot_arms_watchdog_and_starts_tasks() -> TestResult {
    let device = Device::new(ResetCause::POWER_ON);
    let outcome = device.boot(fast_config())?;

    assert!(!outcome.fallback);
    assert!(outcome.watchdog_armed);
    assert_eq!(outcome.boot_timeout_ms, 8000);
    assert_eq!(outcome.steady_timeout_ms, 3000);
    assert_eq!(outcome.retune_delay_ms, 10_000);
    assert_eq!(device.watchdog.inits(), vec![8000]);
    assert!(device.register.reset_cause().is_empty());

    let supervisor = must_some(outcome.supervisor.clone(), "supervisor started");
    let config = must_some(supervisor.snapshot().config, "session config");
    assert!(config.led_monitoring_enabled);
    assert!(wait_until(Duration::from_secs(2), || {
        device.watchdog.feed_count() > 0
    }));

    outcome.shutdown();
    assert!(device.reset.resets().is_empty());
    Ok(())
}

#[test]
fn healthy_device_retunes_to_steady_timeout() -> TestResult {
    let device = Device::new(ResetCause::POWER_ON);
    let outcome = device.boot(AppConfig {
        retune_delay_ms: 50,
        ..fast_config()
    })?;

    assert!(wait_until(Duration::from_secs(2), || {
        device.watchdog.retunes() == vec![3000]
    }));

    outcome.shutdown();
    Ok(())
}

#[test]
fn third_watchdog_boot_enters_fallback() -> TestResult {
    let device = Device::new(ResetCause::POWER_ON);

    for expected in 1..=2 {
        let outcome = device.watchdog_boot(fast_config())?;
        assert!(!outcome.fallback);
        assert_eq!(device.history().consecutive_watchdog(), expected);
        outcome.shutdown();
    }

    let outcome = device.watchdog_boot(fast_config())?;
    assert!(outcome.fallback);
    assert_eq!(outcome.steady_timeout_ms, 8000);
    assert_eq!(outcome.retune_delay_ms, 0);

    let history = device.history();
    assert_eq!(history.consecutive_watchdog(), 0);
    assert_eq!(history.total_watchdog(), 3);

    let supervisor = must_some(outcome.supervisor.clone(), "supervisor started");
    let config = must_some(supervisor.snapshot().config, "session config");
    assert!(!config.led_monitoring_enabled);

    outcome.shutdown();
    Ok(())
}

#[test]
fn power_on_after_fallback_boots_normally() -> TestResult {
    let device = Device::new(ResetCause::POWER_ON);
    for _ in 0..3 {
        device.watchdog_boot(fast_config())?.shutdown();
    }

    let outcome = device.boot(fast_config())?;
    assert!(!outcome.fallback);
    assert_eq!(device.history().total_watchdog(), 3);
    outcome.shutdown();
    Ok(())
}

#[test]
fn fallback_forces_reboot_after_ceiling() -> TestResult {
    let device = Device::new(ResetCause::WATCHDOG);
    let seed = device.history();
    seed.record_boot(true)?;
    seed.record_boot(true)?;

    let outcome = device.boot(AppConfig {
        safe_mode_reboot_delay_ms: 50,
        ..fast_config()
    })?;
    assert!(outcome.fallback);

    assert!(wait_until(Duration::from_secs(2), || {
        device.reset.resets() == vec![RecoveryReason::SafeModeRebootTimeout]
    }));

    outcome.shutdown();
    Ok(())
}

#[test]
fn normal_boot_schedules_no_reboot_ceiling() -> TestResult {
    let device = Device::new(ResetCause::POWER_ON);
    let outcome = device.boot(AppConfig {
        safe_mode_reboot_delay_ms: 50,
        ..fast_config()
    })?;

    std::thread::sleep(Duration::from_millis(150));
    assert!(device.reset.resets().is_empty());

    outcome.shutdown();
    Ok(())
}

#[test]
#[traced_test]
fn watchdog_init_failure_requests_recovery() -> TestResult {
    let device = Device::new(ResetCause::POWER_ON);
    device.watchdog.fail_init(true);

    let outcome = device.boot(fast_config())?;

    assert!(!outcome.watchdog_armed);
    assert!(outcome.supervisor.is_none());
    assert!(outcome.heartbeat.is_none());
    assert_eq!(
        device.reset.resets(),
        vec![RecoveryReason::WatchdogInitFail]
    );
    assert!(logs_contain("EVT,WATCHDOG,INIT_FAIL,rc="));
    assert!(logs_contain("EVT,RECOVERY,WATCHDOG_INIT_FAIL"));
    assert!(logs_contain("EVT,RECOVERY,REQUEST,reason=WATCHDOG_INIT_FAIL"));
    assert!(!logs_contain("EVT,APP,READY"));
    Ok(())
}

#[test]
fn override_replaces_steady_timeout() -> TestResult {
    let device = Device::new(ResetCause::POWER_ON);
    device.history().set_watchdog_override(5000)?;

    let outcome = device.boot(AppConfig {
        retune_delay_ms: 20,
        ..fast_config()
    })?;
    assert_eq!(outcome.steady_timeout_ms, 5000);
    assert!(wait_until(Duration::from_secs(2), || {
        device.watchdog.retunes() == vec![5000]
    }));

    outcome.shutdown();
    Ok(())
}

#[test]
fn fallback_never_shortens_below_boot_timeout() -> TestResult {
    let device = Device::new(ResetCause::WATCHDOG);
    let seed = device.history();
    seed.set_watchdog_override(2000)?;
    seed.record_boot(true)?;
    seed.record_boot(true)?;

    let outcome = device.boot(fast_config())?;
    assert!(outcome.fallback);
    assert_eq!(outcome.steady_timeout_ms, 8000);

    outcome.shutdown();
    Ok(())
}

#[test]
#[traced_test]
fn unreadable_history_still_boots() -> TestResult {
    let device = Device::new(ResetCause::WATCHDOG);
    device.flash.set_fail_reads(true);

    let outcome = device.boot(fast_config())?;

    assert!(!outcome.fallback);
    assert!(outcome.watchdog_armed);
    assert!(logs_contain("Fault history init failed"));
    assert!(logs_contain("EVT,APP,READY"));

    outcome.shutdown();
    Ok(())
}

#[test]
#[traced_test]
fn boot_emits_diagnostic_lines_in_order() -> TestResult {
    let device = Device::new(ResetCause::WATCHDOG);
    let outcome = device.boot(fast_config())?;

    assert!(logs_contain("EVT,APP,START"));
    assert!(logs_contain("Reset cause: WATCHDOG"));
    assert!(logs_contain("EVT,WATCHDOG,RESET_HISTORY,consecutive=1,total=1"));
    assert!(logs_contain(
        "EVT,WATCHDOG,CONFIGURED,boot_ms=8000,steady_ms=3000,retune_delay_ms=10000"
    ));
    assert!(logs_contain("EVT,APP,READY"));
    assert!(!logs_contain("EVT,SAFE_MODE,ENTERED"));

    outcome.shutdown();
    Ok(())
}

#[test]
#[traced_test]
fn fallback_boot_announces_safe_mode() -> TestResult {
    let device = Device::new(ResetCause::WATCHDOG);
    let seed = device.history();
    seed.record_boot(true)?;
    seed.record_boot(true)?;

    let outcome = device.boot(fast_config())?;

    assert!(logs_contain("EVT,SAFE_MODE,ENTERED"));
    assert!(!logs_contain("EVT,SAFE_MODE,ENTERED,"));
    logs_assert(|lines: &[&str]| {
        let entered = lines
            .iter()
            .filter(|line| line.trim_end().ends_with("EVT,SAFE_MODE,ENTERED"))
            .collect::<Vec<_>>();
        match entered.as_slice() {
            [line] if line.contains("ERROR") => Ok(()),
            other => Err(format!("expected one ERROR safe-mode line, got {other:?}")),
        }
    });
    assert!(logs_contain("EVT,WATCHDOG,COUNTER_CLEARED"));
    assert!(logs_contain("EVT,SAFE_MODE,REBOOT_SCHEDULED,delay_ms=300000"));
    assert!(logs_contain("EVT,WATCHDOG,RETUNE_DISABLED_SAFE_MODE"));

    outcome.shutdown();
    Ok(())
}
