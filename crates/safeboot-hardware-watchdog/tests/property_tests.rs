//! Property-based tests for watchdog state machine invariants.

use proptest::prelude::*;
use safeboot_hardware_watchdog::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_init_accepts_exactly_the_peripheral_range(timeout_ms in 0u32..40_000) {
        let watchdog = SoftwareWatchdog::default();
        let in_range = (MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&timeout_ms);

        prop_assert_eq!(watchdog.init(timeout_ms).is_ok(), in_range);
        prop_assert_eq!(watchdog.is_enabled(), in_range);
        prop_assert_eq!(watchdog.timeout_ms(), if in_range { timeout_ms } else { 0 });
    }

    #[test]
    fn prop_timely_feeds_never_expire(
        timeout_ms in 50u32..5_000,
        gaps_pct in prop::collection::vec(0u64..90, 1..40),
    ) {
        let watchdog = SoftwareWatchdog::default();
        prop_assert!(watchdog.init(timeout_ms).is_ok());

        for pct in gaps_pct {
            watchdog.advance_us(u64::from(timeout_ms) * 10 * pct);
            prop_assert!(watchdog.feed().is_ok());
        }
        prop_assert!(!watchdog.has_expired());
    }

    #[test]
    fn prop_timeout_is_last_accepted_value(
        boot_ms in 1u32..=MAX_TIMEOUT_MS,
        retunes in prop::collection::vec(0u32..40_000, 0..10),
    ) {
        let watchdog = SoftwareWatchdog::default();
        prop_assert!(watchdog.init(boot_ms).is_ok());

        let mut expected = boot_ms;
        for ms in retunes {
            if watchdog.retune(ms).is_ok() {
                expected = ms;
            }
        }
        prop_assert_eq!(watchdog.timeout_ms(), expected);
    }

    #[test]
    fn prop_expiry_count_never_decreases(cycles in 1u32..10) {
        let watchdog = SoftwareWatchdog::default();
        for cycle in 1..=cycles {
            prop_assert!(watchdog.init(10).is_ok());
            watchdog.advance_us(20_000);
            prop_assert!(watchdog.has_expired());
            prop_assert_eq!(watchdog.metrics().expiry_count, cycle);
            watchdog.reset();
        }
    }
}
