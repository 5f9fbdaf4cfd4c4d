//! Commonly used recovery types.

pub use crate::controller::{RecoveryController, RecoveryHandler, SystemReset};
pub use crate::error::{RecoveryError, RecoveryResult};
pub use crate::reason::RecoveryReason;
