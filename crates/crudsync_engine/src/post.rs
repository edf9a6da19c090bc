//! Creation of new entities from drafts.

use crate::engine::Core;
use crate::transport::CrudTransport;
use crudsync_store::{Mutation, PostStatus, QueryResult};
use futures::future::join_all;
use tracing::{debug, info, warn};

impl<T: CrudTransport> Core<T> {
    /// First half of a post: marks the editor slot busy and every recorded
    /// query loading.
    ///
    /// Any listing may be affected by a create, so all of them are
    /// invalidated. Returns the recorded queries for the final refetch.
    pub(crate) fn begin_post(&self, editor: &str) -> Vec<(String, T::Query)> {
        self.store.update(|state| {
            let queries: Vec<(String, T::Query)> = state
                .all_queries()
                .iter()
                .map(|(slot, query)| (slot.clone(), query.clone()))
                .collect();

            let mut mutations = Vec::with_capacity(queries.len() + 1);
            mutations.push(Mutation::SetPostStatus {
                editor: editor.to_string(),
                status: PostStatus::pending(),
            });
            for (slot, _) in &queries {
                mutations.push(Mutation::SetResults {
                    slot: slot.clone(),
                    result: QueryResult::loading_from(state.results(slot)),
                });
            }
            (mutations, queries)
        })
    }

    /// Second half of a post: the insert, its outcome, then a refetch of
    /// every query recorded when the post began.
    ///
    /// A failure keeps the draft in the slot's post status. With `retry` it
    /// also sets a retry deadline and arms reconciliation. The refetch runs
    /// whatever the outcome, which also releases the loading flags.
    pub(crate) async fn finish_post(
        &self,
        draft: T::Input,
        editor: String,
        retry: bool,
        refetch: Vec<(String, T::Query)>,
    ) {
        match self.transport.insert(&draft).await {
            Ok(entity) => {
                let id = self.kind.id_of(&entity);
                info!(editor = %editor, id = %id, "entity created");
                self.store.apply_all(vec![
                    Mutation::SetEntities(vec![(id, entity.clone())]),
                    Mutation::SetPostStatus {
                        editor,
                        status: PostStatus::succeeded(entity),
                    },
                ]);
                self.record(|s| s.posts += 1);
            }
            Err(e) => {
                let retry_at = retry.then(|| {
                    self.clock.now_millis() + self.config.post_retry_delay.as_millis() as u64
                });
                warn!(
                    editor = %editor,
                    error = %e,
                    status = ?e.status,
                    retry_at = ?retry_at,
                    "create failed"
                );
                self.store.apply(Mutation::SetPostStatus {
                    editor,
                    status: PostStatus::failed(e.message, e.status, draft, retry_at),
                });
                self.record(|s| s.post_failures += 1);
                if retry {
                    self.signal_sync_quietly();
                }
            }
        }

        debug!(count = refetch.len(), "refetching queries after create");
        join_all(
            refetch
                .into_iter()
                .map(|(slot, query)| self.fetch_results(slot, query)),
        )
        .await;
    }
}
