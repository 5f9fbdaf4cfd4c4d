//! Diagnostic event line definitions.

use core::fmt;

/// Subsystem tag of a diagnostic event line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    /// Application lifecycle (start, ready).
    App,
    /// Fallback / safe mode transitions.
    SafeMode,
    /// Watchdog configuration, history and retuning.
    Watchdog,
    /// Periodic liveness heartbeat.
    Heartbeat,
    /// Recovery escalation and device resets.
    Recovery,
}

impl EventTag {
    /// Wire representation of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::App => "APP",
            Self::SafeMode => "SAFE_MODE",
            Self::Watchdog => "WATCHDOG",
            Self::Heartbeat => "HEARTBEAT",
            Self::Recovery => "RECOVERY",
        }
    }

    /// All known tags.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::App,
            Self::SafeMode,
            Self::Watchdog,
            Self::Heartbeat,
            Self::Recovery,
        ]
        .into_iter()
    }
}

impl fmt::Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `EVT,<tag>,<status>[,<key>=<value>...]` line.
///
/// Fields keep their insertion order. Values are rendered with `Display`
/// at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLine {
    tag: EventTag,
    status: &'static str,
    fields: Vec<(&'static str, String)>,
}

impl EventLine {
    /// Create a line without key/value fields.
    #[must_use]
    pub fn new(tag: EventTag, status: &'static str) -> Self {
        Self {
            tag,
            status,
            fields: Vec::new(),
        }
    }

    /// Append a `key=value` field.
    #[must_use]
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    /// Event tag.
    #[must_use]
    pub fn tag(&self) -> EventTag {
        self.tag
    }

    /// Event status.
    #[must_use]
    pub fn status(&self) -> &'static str {
        self.status
    }

    /// Key/value fields in insertion order.
    #[must_use]
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }
}

impl fmt::Display for EventLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EVT,{},{}", self.tag, self.status)?;
        for (key, value) in &self.fields {
            write!(f, ",{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_line() {
        let line = EventLine::new(EventTag::App, "START");
        assert_eq!(line.to_string(), "EVT,APP,START");
        assert!(line.fields().is_empty());
    }

    #[test]
    fn test_line_with_fields() {
        let line = EventLine::new(EventTag::Watchdog, "CONFIGURED")
            .field("boot_ms", 8000)
            .field("steady_ms", 3000)
            .field("retune_delay_ms", 0);
        assert_eq!(
            line.to_string(),
            "EVT,WATCHDOG,CONFIGURED,boot_ms=8000,steady_ms=3000,retune_delay_ms=0"
        );
        assert_eq!(line.fields().len(), 3);
    }

    #[test]
    fn test_tag_wire_names() {
        let names: Vec<_> = EventTag::all().map(EventTag::as_str).collect();
        assert_eq!(
            names,
            ["APP", "SAFE_MODE", "WATCHDOG", "HEARTBEAT", "RECOVERY"]
        );
    }
}
