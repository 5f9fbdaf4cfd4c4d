//! Status LED.

use tracing::{debug, info};

use crate::error::FirmwareResult;

/// Status LED output.
pub trait StatusLed: Send + std::fmt::Debug {
    /// Configure the output pin.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin is not available.
    fn configure(&mut self) -> FirmwareResult<()>;

    /// Invert the LED. Returns the new level.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin could not be driven.
    fn toggle(&mut self) -> FirmwareResult<bool>;
}

/// LED that only logs its level.
#[derive(Debug, Default)]
pub struct LoggingLed {
    on: bool,
    toggles: u64,
}

impl LoggingLed {
    /// LED starting off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Toggles so far.
    #[must_use]
    pub fn toggles(&self) -> u64 {
        self.toggles
    }
}

impl StatusLed for LoggingLed {
    fn configure(&mut self) -> FirmwareResult<()> {
        info!("Status LED configured");
        Ok(())
    }

    fn toggle(&mut self) -> FirmwareResult<bool> {
        self.on = !self.on;
        self.toggles += 1;
        debug!(on = self.on, "LED");
        Ok(self.on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_alternates() -> FirmwareResult<()> {
        let mut led = LoggingLed::new();
        led.configure()?;
        assert!(led.toggle()?);
        assert!(!led.toggle()?);
        assert_eq!(led.toggles(), 2);
        assert!(!led.is_on());
        Ok(())
    }
}
