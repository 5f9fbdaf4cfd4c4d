//! Shared test utilities for safeboot.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`tracking`] - Allocation tracking for hot-path tests
//! - [`doubles`] - Recording implementations of the collaborator traits
//! - [`prelude`] - Convenience re-exports
//!
//! ```rust,ignore
//! use safeboot_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod must;
pub mod prelude;

#[cfg(feature = "tracking")]
#[cfg_attr(docsrs, doc(cfg(feature = "tracking")))]
pub mod tracking;

#[cfg(all(test, feature = "tracking"))]
#[global_allocator]
static GLOBAL_TEST: tracking::TrackingAllocator = tracking::TrackingAllocator;

#[cfg(feature = "doubles")]
#[cfg_attr(docsrs, doc(cfg(feature = "doubles")))]
pub mod doubles;

pub use must::*;

#[cfg(feature = "tracking")]
pub use tracking::track;
