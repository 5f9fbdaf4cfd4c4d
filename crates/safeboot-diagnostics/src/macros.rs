//! Macros for emitting diagnostic event lines.

/// Emit an `EVT,...` line through `tracing` at the given level.
///
/// The level is one of the `tracing::Level` constant names (`TRACE`, `DEBUG`,
/// `INFO`, `WARN`, `ERROR`). Key/value fields follow the status.
///
/// # Example
///
/// ```rust
/// use safeboot_diagnostics::{EventTag, evt};
///
/// let consecutive = 2;
/// evt!(WARN, EventTag::Watchdog, "RESET_HISTORY", consecutive = consecutive, total = 7);
/// evt!(ERROR, EventTag::SafeMode, "ENTERED");
/// ```
#[macro_export]
macro_rules! evt {
    ($level:ident, $tag:expr, $status:expr $(, $key:ident = $value:expr)* $(,)?) => {{
        let line = $crate::EventLine::new($tag, $status)
            $(.field(::core::stringify!($key), &$value))*;
        $crate::__tracing::event!($crate::__tracing::Level::$level, "{}", line);
    }};
}
