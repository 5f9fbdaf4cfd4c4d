//! Durable fault record and its on-flash encoding.
//!
//! Layout, little endian, 20 bytes:
//!
//! ```text
//! offset  field
//! 0       magic "SBFH"
//! 4       consecutive watchdog resets
//! 8       total watchdog resets
//! 12      watchdog timeout override in ms (0 = unset)
//! 16      CRC-32 of bytes 0..16
//! ```

use crate::error::{FaultHistoryError, FaultHistoryResult};

/// Consecutive watchdog-caused boots after which the device enters fallback.
pub const FALLBACK_THRESHOLD: u32 = 3;

/// Key the record is stored under.
pub const RECORD_KEY: &str = "fault_history";

/// Encoded record length in bytes.
pub const RECORD_LEN: usize = 20;

const MAGIC: [u8; 4] = *b"SBFH";
const CRC_OFFSET: usize = 16;

/// Watchdog-reset history persisted across power cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaultRecord {
    /// Length of the trailing run of watchdog-caused boots.
    pub consecutive_watchdog_resets: u32,
    /// Watchdog-caused boots over the device lifetime.
    pub total_watchdog_resets: u32,
    /// Custom steady watchdog timeout; 0 means use the default.
    pub watchdog_timeout_override_ms: u32,
}

impl FaultRecord {
    /// Whether the consecutive run reached [`FALLBACK_THRESHOLD`].
    #[must_use]
    pub fn is_fallback_active(&self) -> bool {
        self.consecutive_watchdog_resets >= FALLBACK_THRESHOLD
    }

    /// Account for one boot.
    pub fn record_boot(&mut self, was_watchdog_reset: bool) {
        if was_watchdog_reset {
            self.consecutive_watchdog_resets = self.consecutive_watchdog_resets.saturating_add(1);
            self.total_watchdog_resets = self.total_watchdog_resets.saturating_add(1);
        } else {
            self.consecutive_watchdog_resets = 0;
        }
    }

    /// Override as an `Option`.
    #[must_use]
    pub fn watchdog_override(&self) -> Option<u32> {
        (self.watchdog_timeout_override_ms != 0).then_some(self.watchdog_timeout_override_ms)
    }

    /// Encode for storage.
    #[must_use]
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        let words = [
            u32::from_le_bytes(MAGIC),
            self.consecutive_watchdog_resets,
            self.total_watchdog_resets,
            self.watchdog_timeout_override_ms,
        ];
        for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        let crc = crc32fast::hash(out.get(..CRC_OFFSET).unwrap_or_default());
        if let Some(tail) = out.get_mut(CRC_OFFSET..) {
            tail.copy_from_slice(&crc.to_le_bytes());
        }
        out
    }

    /// Decode stored bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FaultHistoryError::Corrupt`] on a length, magic or checksum
    /// mismatch.
    pub fn decode(bytes: &[u8]) -> FaultHistoryResult<Self> {
        let found = bytes.len();
        let Ok(bytes) = <&[u8; RECORD_LEN]>::try_from(bytes) else {
            return Err(FaultHistoryError::Corrupt(format!(
                "expected {RECORD_LEN} bytes, found {found}"
            )));
        };

        let mut words = [0u32; 5];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(chunk);
            *word = u32::from_le_bytes(raw);
        }
        let [magic, consecutive, total, override_ms, stored_crc] = words;

        if magic != u32::from_le_bytes(MAGIC) {
            return Err(FaultHistoryError::Corrupt(format!("bad magic {magic:#010x}")));
        }
        let crc = crc32fast::hash(bytes.get(..CRC_OFFSET).unwrap_or_default());
        if crc != stored_crc {
            return Err(FaultHistoryError::Corrupt(format!(
                "checksum mismatch: stored {stored_crc:#010x}, computed {crc:#010x}"
            )));
        }

        Ok(Self {
            consecutive_watchdog_resets: consecutive,
            total_watchdog_resets: total,
            watchdog_timeout_override_ms: override_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_fallback_threshold_boundary() {
        let mut record = FaultRecord::default();
        for _ in 1..FALLBACK_THRESHOLD {
            record.record_boot(true);
        }
        assert!(!record.is_fallback_active());

        record.record_boot(true);
        assert!(record.is_fallback_active());

        record.record_boot(false);
        assert!(!record.is_fallback_active());
        assert_eq!(record.total_watchdog_resets, FALLBACK_THRESHOLD);
    }

    #[test]
    fn test_encode_decode() -> TestResult {
        let record = FaultRecord {
            consecutive_watchdog_resets: 2,
            total_watchdog_resets: 17,
            watchdog_timeout_override_ms: 2500,
        };
        let bytes = record.encode();
        assert_eq!(bytes.get(..4), Some(&b"SBFH"[..]));
        assert_eq!(FaultRecord::decode(&bytes)?, record);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let bytes = FaultRecord::default().encode();
        let truncated = FaultRecord::decode(bytes.get(..12).unwrap_or_default());
        assert!(
            matches!(
                &truncated,
                Err(FaultHistoryError::Corrupt(msg)) if msg == "expected 20 bytes, found 12"
            ),
            "{truncated:?}"
        );
        assert!(matches!(
            FaultRecord::decode(&[]),
            Err(FaultHistoryError::Corrupt(_))
        ));
    }

    #[test]
    fn test_decode_rejects_flipped_bit() {
        let mut bytes = FaultRecord::default().encode();
        if let Some(byte) = bytes.get_mut(5) {
            *byte ^= 0x01;
        }
        assert!(matches!(
            FaultRecord::decode(&bytes),
            Err(FaultHistoryError::Corrupt(msg)) if msg.contains("checksum")
        ));
    }

    #[test]
    fn test_decode_rejects_erased_flash() {
        assert!(matches!(
            FaultRecord::decode(&[0xFF; RECORD_LEN]),
            Err(FaultHistoryError::Corrupt(msg)) if msg.contains("magic")
        ));
    }

    #[test]
    fn test_override_option() {
        let mut record = FaultRecord::default();
        assert_eq!(record.watchdog_override(), None);
        record.watchdog_timeout_override_ms = 4000;
        assert_eq!(record.watchdog_override(), Some(4000));
    }
}
