//! Reset-cause register.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;
use tracing::warn;

bitflags! {
    /// Why the device last came out of reset.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResetCause: u32 {
        /// Independent watchdog expired.
        const WATCHDOG = 1 << 0;
        /// Software-requested reset.
        const SOFTWARE = 1 << 1;
        /// Power applied or brown-out.
        const POWER_ON = 1 << 2;
    }
}

/// Latched reset-cause flags, read once per boot.
pub trait ResetCauseRegister: Send + Sync {
    /// Flags latched since the last clear.
    fn reset_cause(&self) -> ResetCause;

    /// Clear the latched flags.
    fn clear_reset_cause(&self);
}

/// Log every latched cause as a warning.
pub fn log_reset_cause(cause: ResetCause) {
    for (name, _) in cause.iter_names() {
        warn!("Reset cause: {name}");
    }
}

/// In-memory register, for tests and embedded simulations.
#[derive(Debug, Default)]
pub struct LatchedResetCause {
    bits: AtomicU32,
}

impl LatchedResetCause {
    /// Register with `cause` latched.
    #[must_use]
    pub fn new(cause: ResetCause) -> Self {
        Self {
            bits: AtomicU32::new(cause.bits()),
        }
    }

    /// Latch additional flags.
    pub fn latch(&self, cause: ResetCause) {
        self.bits.fetch_or(cause.bits(), Ordering::SeqCst);
    }
}

impl ResetCauseRegister for LatchedResetCause {
    fn reset_cause(&self) -> ResetCause {
        ResetCause::from_bits_truncate(self.bits.load(Ordering::SeqCst))
    }

    fn clear_reset_cause(&self) {
        self.bits.store(0, Ordering::SeqCst);
    }
}

/// Register persisted in a file, so a host process can learn why its
/// previous incarnation ended.
///
/// A missing file reads as [`ResetCause::POWER_ON`].
#[derive(Debug, Clone)]
pub struct FileResetCause {
    path: PathBuf,
}

impl FileResetCause {
    /// Register backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `cause` for the next boot.
    ///
    /// # Errors
    ///
    /// Returns an error if the file could not be written.
    pub fn record(&self, cause: ResetCause) -> io::Result<()> {
        let temp = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp)?;
        write!(file, "{}", cause.bits())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp, &self.path)
    }
}

impl ResetCauseRegister for FileResetCause {
    fn reset_cause(&self) -> ResetCause {
        match fs::read_to_string(&self.path) {
            Ok(text) => match text.trim().parse::<u32>() {
                Ok(bits) => ResetCause::from_bits_truncate(bits),
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err, "Unreadable reset cause");
                    ResetCause::empty()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => ResetCause::POWER_ON,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to read reset cause");
                ResetCause::empty()
            }
        }
    }

    fn clear_reset_cause(&self) {
        if let Err(err) = self.record(ResetCause::empty()) {
            warn!(path = %self.path.display(), error = %err, "Failed to clear reset cause");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_latched_register() {
        let register = LatchedResetCause::new(ResetCause::WATCHDOG);
        register.latch(ResetCause::SOFTWARE);
        assert_eq!(
            register.reset_cause(),
            ResetCause::WATCHDOG | ResetCause::SOFTWARE
        );
        register.clear_reset_cause();
        assert!(register.reset_cause().is_empty());
    }

    #[test]
    fn test_file_register_lifecycle() -> TestResult {
        let dir = tempfile::tempdir()?;
        let register = FileResetCause::new(dir.path().join("reset_cause"));

        assert_eq!(register.reset_cause(), ResetCause::POWER_ON);
        register.record(ResetCause::WATCHDOG)?;
        assert_eq!(register.reset_cause(), ResetCause::WATCHDOG);
        register.clear_reset_cause();
        assert!(register.reset_cause().is_empty());
        Ok(())
    }

    #[test]
    #[traced_test]
    fn test_logs_each_cause() {
        log_reset_cause(ResetCause::WATCHDOG | ResetCause::POWER_ON);
        assert!(logs_contain("Reset cause: WATCHDOG"));
        assert!(logs_contain("Reset cause: POWER_ON"));
        assert!(!logs_contain("Reset cause: SOFTWARE"));
    }
}
