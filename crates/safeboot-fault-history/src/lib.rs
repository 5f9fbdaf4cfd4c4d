//! Durable watchdog-reset history for safeboot.
//!
//! The store remembers how many boots in a row were caused by the watchdog
//! and how many watchdog resets happened in total, plus an optional custom
//! steady-state watchdog timeout. Every mutation is persisted before the
//! call returns, so an acknowledged change survives an immediate crash.
//!
//! Once [`FALLBACK_THRESHOLD`] watchdog-caused boots have happened in a row,
//! [`FaultHistoryStore::is_fallback_active`] reports that the device should
//! come up in its degraded safe mode.
//!
//! ```rust
//! use safeboot_fault_history::prelude::*;
//!
//! let flash = MemoryStorage::new();
//! let store = FaultHistoryStore::new(flash.clone());
//! store.init().expect("empty flash loads as zeroes");
//!
//! for _ in 0..FALLBACK_THRESHOLD {
//!     store.record_boot(true).expect("persisted");
//! }
//! assert!(store.is_fallback_active());
//!
//! // A warm reboot keeps the flash contents.
//! store.reload();
//! store.init().expect("reload");
//! assert_eq!(store.consecutive_watchdog(), FALLBACK_THRESHOLD);
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

pub mod error;
pub mod prelude;
pub mod record;
pub mod storage;
pub mod store;

pub use error::{FaultHistoryError, FaultHistoryResult, StorageError};
pub use record::{FALLBACK_THRESHOLD, FaultRecord, RECORD_KEY, RECORD_LEN};
pub use storage::{FileStorage, MemoryStorage, RecordStorage};
pub use store::{BootHistory, FaultHistoryStore};
