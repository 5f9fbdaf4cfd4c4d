//! Liveness channels.

use std::fmt;
use std::time::Duration;

use portable_atomic::{AtomicU64, Ordering};

/// Which liveness signal a channel tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoredChannel {
    /// Status LED task.
    Led,
    /// Main system task.
    System,
}

impl MonitoredChannel {
    /// Name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Led => "LED",
            Self::System => "SYSTEM",
        }
    }
}

impl fmt::Display for MonitoredChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Freshness of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Notified within the stale threshold.
    Fresh,
    /// Not notified within the stale threshold.
    Stale,
}

/// Last-alive timestamp with a fixed stale threshold.
///
/// One producer writes, the supervisor tick reads. Timestamps are
/// milliseconds on the supervisor's monotonic clock.
#[derive(Debug)]
pub struct HealthChannel {
    kind: MonitoredChannel,
    last_alive_ms: AtomicU64,
    stale_threshold_ms: u64,
}

impl HealthChannel {
    /// Create a channel considered alive at time 0.
    #[must_use]
    pub fn new(kind: MonitoredChannel, stale_threshold: Duration) -> Self {
        Self {
            kind,
            last_alive_ms: AtomicU64::new(0),
            stale_threshold_ms: u64::try_from(stale_threshold.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Channel kind.
    #[must_use]
    pub fn kind(&self) -> MonitoredChannel {
        self.kind
    }

    /// Stale threshold in milliseconds.
    #[must_use]
    pub fn stale_threshold_ms(&self) -> u64 {
        self.stale_threshold_ms
    }

    /// Record liveness at `now_ms`.
    #[inline]
    pub fn touch(&self, now_ms: u64) {
        self.last_alive_ms.store(now_ms, Ordering::Release);
    }

    /// Milliseconds since the last notification.
    #[must_use]
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_alive_ms.load(Ordering::Acquire))
    }

    /// Freshness at `now_ms`.
    #[must_use]
    pub fn state(&self, now_ms: u64) -> ChannelState {
        if self.age_ms(now_ms) > self.stale_threshold_ms {
            ChannelState::Stale
        } else {
            ChannelState::Fresh
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_only_past_threshold() {
        let channel = HealthChannel::new(MonitoredChannel::System, Duration::from_millis(100));
        channel.touch(1_000);

        assert_eq!(channel.state(1_100), ChannelState::Fresh);
        assert_eq!(channel.state(1_101), ChannelState::Stale);

        channel.touch(1_101);
        assert_eq!(channel.state(1_150), ChannelState::Fresh);
        assert_eq!(channel.age_ms(1_150), 49);
    }

    #[test]
    fn test_clock_behind_timestamp_is_fresh() {
        let channel = HealthChannel::new(MonitoredChannel::Led, Duration::from_millis(10));
        channel.touch(500);
        assert_eq!(channel.age_ms(400), 0);
        assert_eq!(channel.state(400), ChannelState::Fresh);
    }

    #[test]
    fn test_names() {
        assert_eq!(MonitoredChannel::Led.to_string(), "LED");
        assert_eq!(MonitoredChannel::System.as_str(), "SYSTEM");
    }
}
