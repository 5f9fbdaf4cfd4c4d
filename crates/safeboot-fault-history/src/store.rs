//! The fault-history store.

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::FaultHistoryResult;
use crate::record::{FaultRecord, RECORD_KEY};
use crate::storage::RecordStorage;

/// The part of the history the health supervisor needs.
///
/// Once the device has survived its boot window the consecutive watchdog
/// streak is forgiven.
pub trait BootHistory: Send + Sync {
    /// Reset the consecutive watchdog counter and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the change could not be persisted.
    fn clear_watchdog_counter(&self) -> FaultHistoryResult<()>;
}

struct Inner {
    storage: Box<dyn RecordStorage>,
    cache: Option<FaultRecord>,
}

impl Inner {
    /// Read the backing record into the cache.
    ///
    /// Absent or corrupt data loads as zeroes. A read error also leaves a
    /// zeroed cache but is returned so the caller can report lost history.
    fn load(&mut self) -> FaultHistoryResult<()> {
        match self.storage.read(RECORD_KEY) {
            Ok(None) => {
                info!("No fault history stored, starting from zero");
                self.cache = Some(FaultRecord::default());
                Ok(())
            }
            Ok(Some(bytes)) => {
                let record = FaultRecord::decode(&bytes).unwrap_or_else(|err| {
                    warn!(error = %err, "Fault history unreadable, starting from zero");
                    FaultRecord::default()
                });
                debug!(?record, "Fault history loaded");
                self.cache = Some(record);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Failed to read fault history, continuity lost");
                self.cache = Some(FaultRecord::default());
                Err(err.into())
            }
        }
    }

    fn record(&mut self) -> &mut FaultRecord {
        if self.cache.is_none() {
            // Failure is already logged and leaves a zeroed record.
            if self.load().is_err() {
                debug!("Using zeroed fault history");
            }
        }
        self.cache.get_or_insert_with(FaultRecord::default)
    }

    fn update(&mut self, f: impl FnOnce(&mut FaultRecord)) -> FaultHistoryResult<()> {
        let record = self.record();
        f(record);
        let bytes = record.encode();
        self.storage.write(RECORD_KEY, &bytes)?;
        Ok(())
    }
}

/// Durable watchdog-reset history.
///
/// All operations serialize on an internal lock, so the boot sequence, the
/// supervisor and an operator command may use one store concurrently. Every
/// mutation updates the in-memory record and then persists it before
/// returning; if persisting fails the error is returned and the in-memory
/// record stays ahead of the medium until the next successful write.
pub struct FaultHistoryStore {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for FaultHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("FaultHistoryStore")
            .field("storage", &inner.storage)
            .field("cache", &inner.cache)
            .finish()
    }
}

impl FaultHistoryStore {
    /// Create a store over `storage`. Nothing is read until [`init`](Self::init).
    pub fn new(storage: impl RecordStorage + 'static) -> Self {
        Self {
            inner: Mutex::new(Inner {
                storage: Box::new(storage),
                cache: None,
            }),
        }
    }

    /// Load the record from storage.
    ///
    /// Does nothing if the record is already loaded. Missing or corrupt data
    /// yields a zeroed record and `Ok`.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium could not be read. The store is still
    /// usable afterwards with a zeroed record.
    pub fn init(&self) -> FaultHistoryResult<()> {
        let mut inner = self.inner.lock();
        if inner.cache.is_some() {
            return Ok(());
        }
        inner.load()
    }

    /// Account for the current boot and persist.
    ///
    /// A watchdog-caused boot increments both counters; any other boot ends
    /// the consecutive run.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be persisted.
    pub fn record_boot(&self, was_watchdog_reset: bool) -> FaultHistoryResult<()> {
        self.inner
            .lock()
            .update(|record| record.record_boot(was_watchdog_reset))
    }

    /// Consecutive watchdog-caused boots.
    pub fn consecutive_watchdog(&self) -> u32 {
        self.inner.lock().record().consecutive_watchdog_resets
    }

    /// Watchdog-caused boots over the device lifetime.
    pub fn total_watchdog(&self) -> u32 {
        self.inner.lock().record().total_watchdog_resets
    }

    /// Whether the device should boot into fallback mode.
    pub fn is_fallback_active(&self) -> bool {
        self.inner.lock().record().is_fallback_active()
    }

    /// Snapshot of the whole record.
    pub fn record(&self) -> FaultRecord {
        *self.inner.lock().record()
    }

    /// Reset the consecutive watchdog counter and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be persisted.
    pub fn clear_watchdog_counter(&self) -> FaultHistoryResult<()> {
        self.inner
            .lock()
            .update(|record| record.consecutive_watchdog_resets = 0)
    }

    /// Persist a custom steady watchdog timeout. `0` clears it.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be persisted.
    pub fn set_watchdog_override(&self, timeout_ms: u32) -> FaultHistoryResult<()> {
        self.inner
            .lock()
            .update(|record| record.watchdog_timeout_override_ms = timeout_ms)
    }

    /// Custom steady watchdog timeout, `0` when unset.
    pub fn watchdog_override(&self) -> u32 {
        self.inner.lock().record().watchdog_timeout_override_ms
    }

    /// Erase the stored record and forget the cached one, as on a device
    /// that has never booted.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium could not be erased.
    pub fn reset_to_factory(&self) -> FaultHistoryResult<()> {
        let mut inner = self.inner.lock();
        inner.cache = None;
        inner.storage.erase(RECORD_KEY)?;
        info!("Fault history reset to factory state");
        Ok(())
    }

    /// Forget the cached record so the next access rereads storage, as
    /// after a reboot that keeps flash contents.
    pub fn reload(&self) {
        self.inner.lock().cache = None;
    }

    /// Whether a record is cached.
    pub fn is_loaded(&self) -> bool {
        self.inner.lock().cache.is_some()
    }
}

impl BootHistory for FaultHistoryStore {
    fn clear_watchdog_counter(&self) -> FaultHistoryResult<()> {
        FaultHistoryStore::clear_watchdog_counter(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultHistoryError;
    use crate::record::{FALLBACK_THRESHOLD, RECORD_LEN};
    use crate::storage::MemoryStorage;
    use tracing_test::traced_test;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn fresh() -> Result<(MemoryStorage, FaultHistoryStore), FaultHistoryError> {
        let flash = MemoryStorage::new();
        let store = FaultHistoryStore::new(flash.clone());
        store.init()?;
        Ok((flash, store))
    }

    #[test]
    fn test_first_boot_is_zeroed() -> TestResult {
        let (_flash, store) = fresh()?;
        assert_eq!(store.record(), FaultRecord::default());
        assert!(!store.is_fallback_active());
        assert_eq!(store.watchdog_override(), 0);
        Ok(())
    }

    #[test]
    fn test_record_boot_counts() -> TestResult {
        let (_flash, store) = fresh()?;
        store.record_boot(true)?;
        store.record_boot(true)?;
        assert_eq!(store.consecutive_watchdog(), 2);
        assert_eq!(store.total_watchdog(), 2);

        store.record_boot(false)?;
        assert_eq!(store.consecutive_watchdog(), 0);
        assert_eq!(store.total_watchdog(), 2);
        Ok(())
    }

    #[test]
    fn test_fallback_after_threshold() -> TestResult {
        let (_flash, store) = fresh()?;
        for _ in 1..FALLBACK_THRESHOLD {
            store.record_boot(true)?;
        }
        assert!(!store.is_fallback_active());
        store.record_boot(true)?;
        assert!(store.is_fallback_active());
        store.record_boot(false)?;
        assert!(!store.is_fallback_active());
        Ok(())
    }

    #[test]
    fn test_every_mutation_is_persisted() -> TestResult {
        let (flash, store) = fresh()?;
        store.record_boot(true)?;
        store.set_watchdog_override(2500)?;
        store.clear_watchdog_counter()?;
        assert_eq!(flash.write_count(), 3);

        let stored = FaultRecord::decode(&flash.raw(RECORD_KEY).unwrap_or_default())?;
        assert_eq!(stored, store.record());
        Ok(())
    }

    #[test]
    fn test_override_survives_reload() -> TestResult {
        let (_flash, store) = fresh()?;
        store.set_watchdog_override(2500)?;

        store.reload();
        assert!(!store.is_loaded());
        store.init()?;
        assert_eq!(store.watchdog_override(), 2500);

        store.set_watchdog_override(0)?;
        store.reload();
        store.init()?;
        assert_eq!(store.watchdog_override(), 0);
        Ok(())
    }

    #[test]
    fn test_reset_to_factory_wipes_flash() -> TestResult {
        let (flash, store) = fresh()?;
        store.record_boot(true)?;
        store.set_watchdog_override(4000)?;

        store.reset_to_factory()?;
        assert_eq!(flash.raw(RECORD_KEY), None);
        store.init()?;
        assert_eq!(store.record(), FaultRecord::default());
        Ok(())
    }

    #[test]
    fn test_init_is_noop_when_loaded() -> TestResult {
        let (flash, store) = fresh()?;
        store.record_boot(true)?;
        flash.put_raw(RECORD_KEY, &FaultRecord::default().encode());

        store.init()?;
        assert_eq!(store.consecutive_watchdog(), 1);
        Ok(())
    }

    #[test]
    #[traced_test]
    fn test_corrupt_record_loads_zeroed() -> TestResult {
        let flash = MemoryStorage::new();
        flash.put_raw(RECORD_KEY, &[0xA5; RECORD_LEN]);
        let store = FaultHistoryStore::new(flash);

        store.init()?;
        assert_eq!(store.record(), FaultRecord::default());
        assert!(logs_contain("Fault history unreadable"));
        Ok(())
    }

    #[test]
    #[traced_test]
    fn test_read_error_is_reported_and_zeroed() {
        let flash = MemoryStorage::new();
        let record = FaultRecord {
            consecutive_watchdog_resets: 2,
            ..FaultRecord::default()
        };
        flash.put_raw(RECORD_KEY, &record.encode());
        flash.set_fail_reads(true);
        let store = FaultHistoryStore::new(flash);

        let result = store.init();
        assert!(matches!(result, Err(ref err) if err.is_storage()));
        assert!(store.is_loaded());
        assert_eq!(store.consecutive_watchdog(), 0);
        assert!(logs_contain("continuity lost"));
    }

    #[test]
    fn test_failed_write_keeps_last_committed() -> TestResult {
        let (flash, store) = fresh()?;
        store.record_boot(true)?;

        flash.set_fail_writes(true);
        assert!(store.record_boot(true).is_err());
        assert_eq!(store.consecutive_watchdog(), 2);

        flash.set_fail_writes(false);
        store.reload();
        store.init()?;
        assert_eq!(store.consecutive_watchdog(), 1);
        Ok(())
    }

    #[test]
    fn test_access_before_init_reads_flash() -> TestResult {
        let flash = MemoryStorage::new();
        flash.put_raw(
            RECORD_KEY,
            &FaultRecord {
                total_watchdog_resets: 9,
                ..FaultRecord::default()
            }
            .encode(),
        );
        let store = FaultHistoryStore::new(flash);
        assert_eq!(store.total_watchdog(), 9);
        Ok(())
    }
}
