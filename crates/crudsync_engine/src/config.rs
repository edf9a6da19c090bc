//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for a [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Debounce window of the reconciliation loop.
    ///
    /// Start signals arriving within the window restart it. It is also the
    /// polling granularity for pending post retries.
    pub reconcile_debounce: Duration,
    /// Delay before a failed post with retry enabled becomes due again.
    pub post_retry_delay: Duration,
    /// Query slot used by the missing-ids loader.
    pub missing_query_slot: String,
}

impl EngineConfig {
    /// Creates a configuration with the default timings.
    pub fn new() -> Self {
        Self {
            reconcile_debounce: Duration::from_millis(500),
            post_retry_delay: Duration::from_secs(15),
            missing_query_slot: String::new(),
        }
    }

    /// Sets the reconciliation debounce window.
    pub fn with_reconcile_debounce(mut self, debounce: Duration) -> Self {
        self.reconcile_debounce = debounce;
        self
    }

    /// Sets the post retry delay.
    pub fn with_post_retry_delay(mut self, delay: Duration) -> Self {
        self.post_retry_delay = delay;
        self
    }

    /// Sets the query slot used by the missing-ids loader.
    pub fn with_missing_query_slot(mut self, slot: impl Into<String>) -> Self {
        self.missing_query_slot = slot.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
