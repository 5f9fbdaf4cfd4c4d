//! Boot sequence.

use std::sync::Arc;

use safeboot_diagnostics::{EventTag, evt};
use safeboot_fault_history::FaultHistoryStore;
use safeboot_hardware_watchdog::WatchdogDriver;
use safeboot_recovery::{RecoveryController, RecoveryReason};
use safeboot_supervisor::{HealthSupervisor, SupervisorConfig};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::FirmwareResult;
use crate::heartbeat::HeartbeatHandle;
use crate::platform::{ResetCause, ResetCauseRegister, StatusLed, log_reset_cause};

/// What the boot sequence decided and started.
#[derive(Debug)]
pub struct BootOutcome {
    /// Whether the device came up in fallback mode.
    pub fallback: bool,
    /// Watchdog timeout armed at boot.
    pub boot_timeout_ms: u32,
    /// Timeout the supervisor retunes to.
    pub steady_timeout_ms: u32,
    /// Delay before the retune.
    pub retune_delay_ms: u32,
    /// Whether the watchdog was armed. When `false` a
    /// `WatchdogInitFail` recovery was requested and nothing else started.
    pub watchdog_armed: bool,
    /// Running supervisor.
    pub supervisor: Option<Arc<HealthSupervisor>>,
    /// Running heartbeat task.
    pub heartbeat: Option<HeartbeatHandle>,
}

impl BootOutcome {
    /// Stop the heartbeat task and the supervisor.
    pub fn shutdown(self) {
        if let Some(heartbeat) = self.heartbeat {
            heartbeat.stop();
        }
        if let Some(supervisor) = self.supervisor {
            supervisor.stop();
        }
    }
}

/// One-shot device bring-up.
pub struct BootSequence {
    config: AppConfig,
    history: Arc<FaultHistoryStore>,
    reset_cause: Arc<dyn ResetCauseRegister>,
    recovery: RecoveryController,
    watchdog: Arc<dyn WatchdogDriver>,
    led: Box<dyn StatusLed>,
}

impl std::fmt::Debug for BootSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootSequence")
            .field("config", &self.config)
            .field("history", &self.history)
            .field("recovery", &self.recovery)
            .field("led", &self.led)
            .finish_non_exhaustive()
    }
}

impl BootSequence {
    /// Collect the collaborators for a boot.
    pub fn new(
        config: AppConfig,
        history: Arc<FaultHistoryStore>,
        reset_cause: Arc<dyn ResetCauseRegister>,
        recovery: RecoveryController,
        watchdog: Arc<dyn WatchdogDriver>,
        led: Box<dyn StatusLed>,
    ) -> Self {
        Self {
            config,
            history,
            reset_cause,
            recovery,
            watchdog,
            led,
        }
    }

    /// Bring the device up.
    ///
    /// Fault history problems are logged and boot continues with zeroed
    /// history. A watchdog that cannot be armed requests a
    /// `WatchdogInitFail` reset and starts nothing else.
    ///
    /// # Errors
    ///
    /// Returns an error if the supervisor or heartbeat task could not be
    /// started.
    pub fn run(self) -> FirmwareResult<BootOutcome> {
        let Self {
            config,
            history,
            reset_cause,
            recovery,
            watchdog,
            led,
        } = self;

        evt!(INFO, EventTag::App, "START");

        if let Err(err) = history.init() {
            error!(error = %err, "Fault history init failed, continuing with empty history");
        }

        let cause = reset_cause.reset_cause();
        log_reset_cause(cause);
        reset_cause.clear_reset_cause();

        if let Err(err) = history.record_boot(cause.contains(ResetCause::WATCHDOG)) {
            error!(error = %err, "Failed to persist boot record");
        }

        let consecutive = history.consecutive_watchdog();
        if consecutive != 0 {
            evt!(
                WARN,
                EventTag::Watchdog,
                "RESET_HISTORY",
                consecutive = consecutive,
                total = history.total_watchdog(),
            );
        }

        let fallback = history.is_fallback_active();
        if fallback {
            evt!(ERROR, EventTag::SafeMode, "ENTERED");
            match history.clear_watchdog_counter() {
                Ok(()) => evt!(INFO, EventTag::Watchdog, "COUNTER_CLEARED"),
                Err(err) => warn!(error = %err, "Failed to clear watchdog counter"),
            }
        }

        recovery.start();
        let ceiling_ms = if fallback {
            config.safe_mode_reboot_delay_ms
        } else {
            0
        };
        if let Err(err) = recovery.schedule_safe_mode_reboot(ceiling_ms) {
            error!(error = %err, "Failed to schedule safe-mode reboot");
        }

        let boot_timeout_ms = config.boot_timeout_ms;
        let mut steady_timeout_ms = match history.watchdog_override() {
            0 => config.steady_timeout_ms,
            override_ms => {
                info!(override_ms, "Using watchdog timeout override");
                override_ms
            }
        };
        let mut retune_delay_ms = config.retune_delay_ms;
        if fallback {
            steady_timeout_ms = steady_timeout_ms.max(boot_timeout_ms);
            retune_delay_ms = 0;
        }

        if let Err(err) = watchdog.init(boot_timeout_ms) {
            evt!(ERROR, EventTag::Watchdog, "INIT_FAIL", rc = err.code());
            evt!(ERROR, EventTag::Recovery, "WATCHDOG_INIT_FAIL");
            recovery.request(RecoveryReason::WatchdogInitFail);
            return Ok(BootOutcome {
                fallback,
                boot_timeout_ms,
                steady_timeout_ms,
                retune_delay_ms,
                watchdog_armed: false,
                supervisor: None,
                heartbeat: None,
            });
        }

        evt!(
            INFO,
            EventTag::Watchdog,
            "CONFIGURED",
            boot_ms = boot_timeout_ms,
            steady_ms = steady_timeout_ms,
            retune_delay_ms = retune_delay_ms,
        );
        if fallback {
            evt!(WARN, EventTag::Watchdog, "RETUNE_DISABLED_SAFE_MODE");
        }

        let supervisor = Arc::new(HealthSupervisor::new(
            Arc::clone(&watchdog),
            Arc::new(recovery.clone()),
            history.clone(),
            config.supervisor_timing(),
        )?);
        let heartbeat =
            HeartbeatHandle::spawn(led, supervisor.clone(), config.heartbeat_config(fallback))?;
        supervisor.start(SupervisorConfig {
            steady_timeout_ms,
            retune_delay_ms,
            led_monitoring_enabled: !fallback,
        })?;

        evt!(INFO, EventTag::App, "READY");

        Ok(BootOutcome {
            fallback,
            boot_timeout_ms,
            steady_timeout_ms,
            retune_delay_ms,
            watchdog_armed: true,
            supervisor: Some(supervisor),
            heartbeat: Some(heartbeat),
        })
    }
}
