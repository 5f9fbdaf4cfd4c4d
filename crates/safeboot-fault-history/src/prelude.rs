//! Commonly used fault-history types.

pub use crate::error::{FaultHistoryError, FaultHistoryResult, StorageError};
pub use crate::record::{FALLBACK_THRESHOLD, FaultRecord};
pub use crate::storage::{FileStorage, MemoryStorage, RecordStorage};
pub use crate::store::{BootHistory, FaultHistoryStore};
