//! Keyed backing stores for the fault record.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::StorageError;

/// Non-volatile key/value medium.
///
/// A successful `write` must be durable when it returns, and a failed one
/// must leave the previously committed value readable.
pub trait RecordStorage: Send + fmt::Debug {
    /// Read the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value was not committed.
    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be modified.
    fn erase(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct Flash {
    entries: HashMap<String, Vec<u8>>,
    fail_reads: bool,
    fail_writes: bool,
    writes: u64,
}

/// Simulated flash held in memory.
///
/// Clones share the same contents, so a fresh store built on a clone sees
/// everything an earlier store committed. Read and write failures can be
/// injected to exercise error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    flash: Arc<Mutex<Flash>>,
}

impl MemoryStorage {
    /// Create empty flash.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.flash.lock().fail_reads = fail;
    }

    /// Make every subsequent write and erase fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.flash.lock().fail_writes = fail;
    }

    /// Number of committed writes.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.flash.lock().writes
    }

    /// Raw bytes under `key`, bypassing fault injection.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.flash.lock().entries.get(key).cloned()
    }

    /// Overwrite raw bytes under `key`, bypassing fault injection.
    pub fn put_raw(&self, key: &str, bytes: &[u8]) {
        self.flash
            .lock()
            .entries
            .insert(key.to_owned(), bytes.to_vec());
    }
}

impl RecordStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let flash = self.flash.lock();
        if flash.fail_reads {
            return Err(StorageError::Injected { operation: "read" });
        }
        Ok(flash.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut flash = self.flash.lock();
        if flash.fail_writes {
            return Err(StorageError::Injected { operation: "write" });
        }
        flash.entries.insert(key.to_owned(), bytes.to_vec());
        flash.writes += 1;
        Ok(())
    }

    fn erase(&mut self, key: &str) -> Result<(), StorageError> {
        let mut flash = self.flash.lock();
        if flash.fail_writes {
            return Err(StorageError::Injected { operation: "erase" });
        }
        flash.entries.remove(key);
        Ok(())
    }
}

/// One file per key under a base directory.
///
/// Writes go to a temporary file which is synced and then renamed over the
/// target, so a crash mid-write leaves the previous value in place.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Storage directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.base_dir.join(format!("{key}.bin")))
    }
}

impl RecordStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let temp_path = path.with_extension("tmp");
        debug!(path = %path.display(), len = bytes.len(), "Writing record atomically");

        let mut file = fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn erase(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
