//! Lifecycle tests for the software watchdog.
//!
//! All tests use `Result<>` return types and avoid `unwrap`/`expect`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use safeboot_hardware_watchdog::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Boot timeout, then steady timeout once the device has proved itself.
#[test]
fn test_boot_then_steady_lifecycle() -> TestResult {
    let watchdog = SoftwareWatchdog::default();

    watchdog.init(8000)?;
    assert_eq!(watchdog.timeout_ms(), 8000);

    watchdog.feed()?;
    watchdog.retune(3000)?;
    watchdog.feed()?;

    assert!(watchdog.is_enabled());
    assert_eq!(watchdog.timeout_ms(), 3000);
    let metrics = watchdog.metrics();
    assert_eq!(metrics.arm_count, 1);
    assert_eq!(metrics.retune_count, 1);
    assert_eq!(metrics.feed_count, 2);
    Ok(())
}

/// Real-time expiry with a short timeout.
#[test]
fn test_expires_without_feed() -> TestResult {
    let watchdog = SoftwareWatchdog::default();
    watchdog.init(10)?;

    thread::sleep(Duration::from_millis(30));

    assert!(watchdog.has_expired());
    assert_eq!(watchdog.status(), WatchdogStatus::Expired);
    Ok(())
}

/// Expiry is terminal: feeding or retuning afterwards does not revive it.
#[test]
fn test_expiry_cannot_be_revoked() -> TestResult {
    let watchdog = SoftwareWatchdog::default();
    watchdog.init(100)?;
    watchdog.advance_us(150_000);

    assert_eq!(watchdog.feed(), Err(HardwareWatchdogError::Expired));
    assert_eq!(watchdog.retune(5000), Err(HardwareWatchdogError::Expired));
    assert!(watchdog.has_expired());
    assert_eq!(watchdog.timeout_ms(), 100);
    Ok(())
}

/// A failed retune leaves the previous timeout armed.
#[test]
fn test_rejected_retune_keeps_boot_timeout() -> TestResult {
    let config = WatchdogConfig::builder().max_timeout_ms(10_000).build()?;
    let watchdog = SoftwareWatchdog::new(config);
    watchdog.init(8000)?;

    assert!(matches!(
        watchdog.retune(20_000),
        Err(HardwareWatchdogError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        watchdog.retune(0),
        Err(HardwareWatchdogError::InvalidConfiguration(_))
    ));
    assert_eq!(watchdog.timeout_ms(), 8000);
    Ok(())
}

/// Feeding from one thread while another polls for expiry.
#[test]
fn test_shared_between_threads() -> TestResult {
    let watchdog = Arc::new(SoftwareWatchdog::default());
    watchdog.init(1000)?;

    let feeder = {
        let watchdog = Arc::clone(&watchdog);
        thread::spawn(move || -> HardwareWatchdogResult<()> {
            for _ in 0..50 {
                watchdog.feed()?;
                thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        })
    };

    for _ in 0..50 {
        assert!(!watchdog.has_expired());
        thread::sleep(Duration::from_millis(1));
    }

    feeder
        .join()
        .map_err(|panic| format!("feeder thread panicked: {panic:?}"))??;
    assert_eq!(watchdog.metrics().feed_count, 50);
    Ok(())
}

/// The trait object forwards through `Arc`.
#[test]
fn test_driver_through_arc_trait_object() -> TestResult {
    let watchdog: Arc<dyn WatchdogDriver> = Arc::new(SoftwareWatchdog::default());
    let shared = Arc::clone(&watchdog);

    shared.init(4000)?;
    assert!(watchdog.is_enabled());
    assert_eq!(watchdog.timeout_ms(), 4000);
    Ok(())
}
