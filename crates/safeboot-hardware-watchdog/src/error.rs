//! Error types for hardware watchdog operations.

use alloc::string::String;

/// Errors that can occur during hardware watchdog operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareWatchdogError {
    /// Watchdog has not been armed with `init()`.
    NotEnabled,
    /// Watchdog is already armed.
    AlreadyEnabled,
    /// Watchdog deadline passed; the device reset cannot be deferred.
    Expired,
    /// The peripheral rejected the timeout change.
    RetuneUnsupported,
    /// Hardware communication error.
    HardwareError(String),
    /// Invalid configuration.
    InvalidConfiguration(String),
    /// State transition not allowed.
    InvalidTransition {
        /// Current state.
        from: &'static str,
        /// Attempted target state.
        to: &'static str,
    },
}

impl HardwareWatchdogError {
    /// Create a hardware error.
    #[must_use]
    pub fn hardware_error(msg: impl Into<String>) -> Self {
        Self::HardwareError(msg.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an invalid transition error.
    #[must_use]
    pub fn invalid_transition(from: &'static str, to: &'static str) -> Self {
        Self::InvalidTransition { from, to }
    }

    /// Numeric code for compact diagnostic lines (`rc=<code>`).
    ///
    /// Codes are negative errno-style values so they read like the return
    /// codes of a C peripheral driver in collected logs.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::NotEnabled => -1,
            Self::AlreadyEnabled => -16,
            Self::Expired => -62,
            Self::RetuneUnsupported => -134,
            Self::HardwareError(_) => -5,
            Self::InvalidConfiguration(_) => -22,
            Self::InvalidTransition { .. } => -71,
        }
    }
}

impl core::fmt::Display for HardwareWatchdogError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotEnabled => write!(f, "Watchdog is not enabled"),
            Self::AlreadyEnabled => write!(f, "Watchdog is already enabled"),
            Self::Expired => write!(f, "Watchdog has expired"),
            Self::RetuneUnsupported => write!(f, "Watchdog timeout cannot be changed once armed"),
            Self::HardwareError(msg) => write!(f, "Hardware error: {msg}"),
            Self::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {msg}"),
            Self::InvalidTransition { from, to } => {
                write!(f, "Invalid state transition: {from} -> {to}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HardwareWatchdogError {}

/// A specialized `Result` type for hardware watchdog operations.
pub type HardwareWatchdogResult<T> = core::result::Result<T, HardwareWatchdogError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        assert_eq!(
            HardwareWatchdogError::NotEnabled.to_string(),
            "Watchdog is not enabled"
        );
        assert_eq!(
            HardwareWatchdogError::Expired.to_string(),
            "Watchdog has expired"
        );
        assert_eq!(
            HardwareWatchdogError::invalid_transition("Expired", "Armed").to_string(),
            "Invalid state transition: Expired -> Armed"
        );
    }

    #[test]
    fn test_error_codes_are_negative() {
        let errors = [
            HardwareWatchdogError::NotEnabled,
            HardwareWatchdogError::AlreadyEnabled,
            HardwareWatchdogError::Expired,
            HardwareWatchdogError::RetuneUnsupported,
            HardwareWatchdogError::hardware_error("bus"),
            HardwareWatchdogError::invalid_configuration("range"),
            HardwareWatchdogError::invalid_transition("Disabled", "Expired"),
        ];
        for err in errors {
            assert!(err.code() < 0, "{err} should map to a negative code");
        }
    }
}
