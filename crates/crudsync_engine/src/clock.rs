//! Time source for retry deadlines.

use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Supplies the current time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds.
    fn now_millis(&self) -> u64;
}

/// Wall clock anchored at construction and advanced by the runtime clock.
///
/// Deadlines stay comparable with persisted epoch timestamps, while paused
/// runtime time (in tests) advances the clock deterministically.
#[derive(Debug, Clone)]
pub struct RuntimeClock {
    epoch_millis: u64,
    anchor: Instant,
}

impl RuntimeClock {
    /// Creates a clock anchored at the current wall-clock time.
    pub fn new() -> Self {
        let epoch_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self::anchored_at(epoch_millis)
    }

    /// Creates a clock that reads `epoch_millis` right now.
    pub fn anchored_at(epoch_millis: u64) -> Self {
        Self {
            epoch_millis,
            anchor: Instant::now(),
        }
    }
}

impl Default for RuntimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for RuntimeClock {
    fn now_millis(&self) -> u64 {
        self.epoch_millis + self.anchor.elapsed().as_millis() as u64
    }
}
