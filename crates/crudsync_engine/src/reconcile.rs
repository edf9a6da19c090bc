//! Background reconciliation loop.
//!
//! The loop is level-triggered and driven by start signals:
//!
//! ```text
//! Idle --signal--> Debounce-wait --quiet window--> Reconcile
//!                   ^   |                              |
//!                   +---+ signal restarts the wait     |
//!                   ^                                  |
//!                   +------ pending retries remain ----+
//! ```
//!
//! Bursts of signals collapse into one pass. A pass pushes every modified
//! entity and resubmits every due post retry; while a retry is not yet due
//! the loop re-arms itself, polling at the debounce granularity.

use crate::engine::Core;
use crate::transport::CrudTransport;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Runs the loop until the signal channel closes or the task is aborted.
pub(crate) async fn run<T: CrudTransport>(
    core: Arc<Core<T>>,
    mut signals: mpsc::UnboundedReceiver<()>,
) {
    while signals.recv().await.is_some() {
        loop {
            tokio::select! {
                signal = signals.recv() => {
                    if signal.is_none() {
                        return;
                    }
                }
                _ = tokio::time::sleep(core.config.reconcile_debounce) => break,
            }
        }

        if core.reconcile() {
            core.signal_sync_quietly();
        }
    }
}

/// Work discovered by one scan of the state.
struct Scan<O, I> {
    writes: Vec<(String, O)>,
    resubmits: Vec<(String, I)>,
    pending_retries: usize,
}

impl<T: CrudTransport> Core<T> {
    /// Runs one reconciliation pass.
    ///
    /// Returns true if some post retry is still pending, in which case the
    /// loop must be re-armed.
    pub(crate) fn reconcile(self: &Arc<Self>) -> bool {
        let now = self.clock.now_millis();
        let scan: Scan<T::Entity, T::Input> = self.store.with(|state| {
            let writes = state
                .all_entity_status()
                .iter()
                .filter(|(_, status)| status.modified)
                .filter_map(|(id, _)| state.entity(id).map(|e| (id.clone(), e.clone())))
                .collect();

            let mut resubmits = Vec::new();
            let mut pending_retries = 0;
            for (editor, status) in state.all_post_status() {
                if !status.has_pending_retry() {
                    continue;
                }
                match (&status.draft, status.is_retry_due(now)) {
                    (Some(draft), true) => resubmits.push((editor.clone(), draft.clone())),
                    _ => pending_retries += 1,
                }
            }

            Scan {
                writes,
                resubmits,
                pending_retries,
            }
        });

        let write_count = scan.writes.len();
        let resubmit_count = scan.resubmits.len();

        for (id, entity) in scan.writes {
            self.spawn_put(id, entity, false);
        }
        for (editor, draft) in scan.resubmits {
            debug!(editor = %editor, "resubmitting draft");
            self.spawn_post(draft, editor, true);
        }

        self.record(|s| {
            s.reconcile_passes += 1;
            s.resubmissions += resubmit_count as u64;
        });

        let rearm = scan.pending_retries > 0;
        info!(
            writes = write_count,
            resubmits = resubmit_count,
            pending_retries = scan.pending_retries,
            rearm,
            "reconciliation pass"
        );
        rearm
    }
}
