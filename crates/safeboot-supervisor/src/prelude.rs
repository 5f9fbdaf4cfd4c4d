//! Commonly used supervisor types.

pub use crate::channel::{ChannelState, MonitoredChannel};
pub use crate::config::{SupervisorConfig, SupervisorTiming};
pub use crate::error::{SupervisorError, SupervisorResult};
pub use crate::supervisor::{HealthSupervisor, SupervisorSnapshot};
