//! Why a reset was requested.

use std::fmt;

/// Cause attached to a recovery request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryReason {
    /// The watchdog peripheral could not be armed at boot.
    WatchdogInitFail,
    /// A monitored liveness channel went stale.
    HealthFault,
    /// An operator asked for a reset.
    ManualTrigger,
    /// The device stayed in fallback mode for the full reboot ceiling.
    SafeModeRebootTimeout,
}

impl RecoveryReason {
    /// Every reason.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::WatchdogInitFail,
            Self::HealthFault,
            Self::ManualTrigger,
            Self::SafeModeRebootTimeout,
        ]
    }

    /// Name used in diagnostic event lines.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WatchdogInitFail => "WATCHDOG_INIT_FAIL",
            Self::HealthFault => "HEALTH_FAULT",
            Self::ManualTrigger => "MANUAL_TRIGGER",
            Self::SafeModeRebootTimeout => "SAFE_MODE_REBOOT_TIMEOUT",
        }
    }
}

impl fmt::Display for RecoveryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique_screaming_case() {
        let names: HashSet<_> = RecoveryReason::all().iter().map(|r| r.as_str()).collect();
        assert_eq!(names.len(), RecoveryReason::all().len());
        for name in names {
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(RecoveryReason::HealthFault.to_string(), "HEALTH_FAULT");
    }
}
