//! # safeboot-diagnostics
//!
//! Line-oriented diagnostic events for external log collectors.
//!
//! Every event renders as a single line:
//!
//! ```text
//! EVT,<tag>,<status>[,<key>=<value>,...]
//! ```
//!
//! Lines are emitted through `tracing`, so they share the subscriber,
//! filtering and timestamps of the rest of the firmware log. The device never
//! parses these lines; they are a logging convention, not a command protocol.
//!
//! ## Example
//!
//! ```rust
//! use safeboot_diagnostics::{EventLine, EventTag, evt};
//!
//! evt!(INFO, EventTag::App, "START");
//! evt!(INFO, EventTag::Heartbeat, "OK", count = 10);
//!
//! let line = EventLine::new(EventTag::Watchdog, "RESET_HISTORY")
//!     .field("consecutive", 2)
//!     .field("total", 5);
//! assert_eq!(line.to_string(), "EVT,WATCHDOG,RESET_HISTORY,consecutive=2,total=5");
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod event;
pub mod macros;
pub mod prelude;

pub use event::{EventLine, EventTag};

#[doc(hidden)]
pub use tracing as __tracing;
