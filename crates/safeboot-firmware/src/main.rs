//! safeboot - host simulation of the watchdog-supervised device
//!
//! Runs the boot sequence against file-backed flash and a software watchdog,
//! and inspects or edits the persisted fault history between runs.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use safeboot_fault_history::{FaultHistoryStore, FileStorage};
use safeboot_firmware::platform::{
    FileResetCause, HostSystemReset, LoggingLed, ResetCause, WatchdogExpiryMonitor,
};
use safeboot_firmware::{AppConfig, BootOutcome, BootSequence, FirmwareError};
use safeboot_hardware_watchdog::config::validate_timeout;
use safeboot_hardware_watchdog::{SoftwareWatchdog, WatchdogConfig};
use safeboot_recovery::RecoveryController;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// File in the data directory that carries the reset cause across runs.
const RESET_CAUSE_FILE: &str = "reset_cause";

/// How often the expiry monitor checks the software watchdog.
const WATCHDOG_POLL: Duration = Duration::from_millis(20);

#[derive(Parser, Debug)]
#[command(name = "safeboot")]
#[command(about = "Watchdog-supervised boot simulation with persistent fault history")]
#[command(version)]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Application configuration file (JSON)
    #[arg(long, global = true, env = "SAFEBOOT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory standing in for the device flash
    #[arg(
        long,
        global = true,
        env = "SAFEBOOT_DATA_DIR",
        default_value = "safeboot-data"
    )]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Boot the device and keep it running
    Run {
        /// Shut down cleanly after this many seconds
        #[arg(long)]
        exit_after: Option<u64>,

        /// Fault to inject while running
        #[arg(long, value_enum)]
        inject: Option<InjectedFault>,

        /// Seconds after boot at which the fault is injected
        #[arg(long, default_value_t = 5)]
        inject_after: u64,
    },

    /// Show the persisted fault history
    History,

    /// Persist a steady-state watchdog timeout override
    SetOverride {
        /// Timeout in milliseconds
        timeout_ms: u32,
    },

    /// Remove the watchdog timeout override
    ClearOverride,

    /// Erase the fault history
    FactoryReset,

    /// Print the effective configuration
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum InjectedFault {
    /// Stop the heartbeat task so the supervisor sees stale channels
    HangHeartbeat,
    /// Stop the supervisor so the watchdog is no longer fed
    StallSupervisor,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("safeboot={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match execute_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if cli.json {
                println!(
                    "{}",
                    json!({ "success": false, "error": format!("{err:#}") })
                );
            } else {
                eprintln!("Error: {err:#}");
            }
            ExitCode::from(exit_code(&err))
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<FirmwareError>() {
        Some(FirmwareError::InvalidConfiguration(_) | FirmwareError::Json(_)) => 4,
        Some(FirmwareError::History(_)) => 3,
        _ => 1,
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run {
            exit_after,
            inject,
            inject_after,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_device(cli, config, *exit_after, inject.map(|fault| (fault, *inject_after)))
        }
        Commands::History => show_history(cli),
        Commands::SetOverride { timeout_ms } => {
            validate_timeout(*timeout_ms)
                .map_err(|err| FirmwareError::InvalidConfiguration(err.to_string()))?;
            let store = open_history(&cli.data_dir)?;
            store
                .set_watchdog_override(*timeout_ms)
                .map_err(FirmwareError::from)?;
            print_ok(cli, &format!("Watchdog override set to {timeout_ms} ms"));
            Ok(())
        }
        Commands::ClearOverride => {
            let store = open_history(&cli.data_dir)?;
            store.set_watchdog_override(0).map_err(FirmwareError::from)?;
            print_ok(cli, "Watchdog override cleared");
            Ok(())
        }
        Commands::FactoryReset => {
            let store = open_history(&cli.data_dir)?;
            store.reset_to_factory().map_err(FirmwareError::from)?;
            print_ok(cli, "Fault history erased");
            Ok(())
        }
        Commands::Config => {
            let config = load_config(cli.config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => Ok(AppConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?),
        None => Ok(AppConfig::default()),
    }
}

fn open_history(data_dir: &Path) -> Result<FaultHistoryStore> {
    let storage = FileStorage::open(data_dir)
        .map_err(|err| FirmwareError::History(err.into()))
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
    Ok(FaultHistoryStore::new(storage))
}

fn print_ok(cli: &Cli, message: &str) {
    if cli.json {
        println!("{}", json!({ "success": true, "message": message }));
    } else {
        println!("{message}");
    }
}

fn show_history(cli: &Cli) -> Result<()> {
    let store = open_history(&cli.data_dir)?;
    if let Err(err) = store.init() {
        warn!(error = %err, "Fault history unreadable");
    }
    let record = store.record();

    if cli.json {
        let value = json!({
            "consecutive_watchdog_resets": record.consecutive_watchdog_resets,
            "total_watchdog_resets": record.total_watchdog_resets,
            "watchdog_timeout_override_ms": record.watchdog_timeout_override_ms,
            "fallback_active": record.is_fallback_active(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("Consecutive watchdog resets: {}", record.consecutive_watchdog_resets);
        println!("Total watchdog resets:       {}", record.total_watchdog_resets);
        match record.watchdog_override() {
            Some(ms) => println!("Watchdog override:           {ms} ms"),
            None => println!("Watchdog override:           none"),
        }
        println!(
            "Fallback mode:               {}",
            if record.is_fallback_active() { "active" } else { "inactive" }
        );
    }
    Ok(())
}

fn run_device(
    cli: &Cli,
    config: AppConfig,
    exit_after: Option<u64>,
    inject: Option<(InjectedFault, u64)>,
) -> Result<()> {
    let history = Arc::new(open_history(&cli.data_dir)?);
    let register = FileResetCause::new(cli.data_dir.join(RESET_CAUSE_FILE));

    let watchdog = Arc::new(SoftwareWatchdog::new(WatchdogConfig::default()));
    let expiry_register = register.clone();
    let monitor = WatchdogExpiryMonitor::spawn(Arc::clone(&watchdog), WATCHDOG_POLL, move || {
        WatchdogExpiryMonitor::hardware_reset(&expiry_register);
    })
    .context("Failed to start watchdog expiry monitor")?;

    let recovery = RecoveryController::new(Arc::new(HostSystemReset::new(register.clone())));
    let boot = BootSequence::new(
        config,
        history,
        Arc::new(register.clone()),
        recovery,
        watchdog,
        Box::new(LoggingLed::new()),
    );
    let started = Instant::now();
    let mut outcome = boot.run().context("Boot failed")?;
    report_boot(cli, &outcome)?;

    if let Some((fault, after_secs)) = inject {
        thread::sleep(Duration::from_secs(after_secs));
        inject_fault(fault, &mut outcome);
    }

    match exit_after {
        Some(secs) => {
            thread::sleep(Duration::from_secs(secs).saturating_sub(started.elapsed()));
        }
        None => loop {
            thread::park();
        },
    }

    monitor.stop();
    outcome.shutdown();
    register
        .record(ResetCause::POWER_ON)
        .context("Failed to latch power-on reset cause")?;
    info!("Clean shutdown");
    Ok(())
}

fn inject_fault(fault: InjectedFault, outcome: &mut BootOutcome) {
    match fault {
        InjectedFault::HangHeartbeat => {
            if let Some(heartbeat) = outcome.heartbeat.take() {
                warn!("Injecting fault: heartbeat task hung");
                heartbeat.stop();
            }
        }
        InjectedFault::StallSupervisor => {
            if let Some(supervisor) = &outcome.supervisor {
                warn!("Injecting fault: supervisor stalled");
                supervisor.stop();
            }
        }
    }
}

fn report_boot(cli: &Cli, outcome: &BootOutcome) -> Result<()> {
    if cli.json {
        let value = json!({
            "fallback": outcome.fallback,
            "watchdog_armed": outcome.watchdog_armed,
            "boot_timeout_ms": outcome.boot_timeout_ms,
            "steady_timeout_ms": outcome.steady_timeout_ms,
            "retune_delay_ms": outcome.retune_delay_ms,
        });
        println!("{}", serde_json::to_string(&value)?);
    } else {
        info!(
            fallback = outcome.fallback,
            boot_ms = outcome.boot_timeout_ms,
            steady_ms = outcome.steady_timeout_ms,
            "Device up"
        );
    }
    Ok(())
}
