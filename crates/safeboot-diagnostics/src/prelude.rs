//! Prelude for safeboot-diagnostics.

pub use crate::event::{EventLine, EventTag};
pub use crate::evt;
