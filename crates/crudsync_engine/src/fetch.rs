//! Query fetch and missing-ids loading.

use crate::engine::Core;
use crate::intent::normalize_ids;
use crate::transport::CrudTransport;
use crudsync_store::{Mutation, QueryResult};
use tracing::{debug, warn};

impl<T: CrudTransport> Core<T> {
    /// Fetches a query slot.
    ///
    /// The slot is marked loading while the call runs, keeping its previous
    /// ids and error. On success the returned entities are merged into the
    /// store and the slot's ids replaced. On failure the previous ids are
    /// kept and the error recorded.
    pub(crate) async fn fetch_results(&self, slot: String, query: T::Query) {
        let previous = self.store.update(|state| {
            let previous = state.results(&slot).cloned();
            let mutations = vec![
                Mutation::SetResults {
                    slot: slot.clone(),
                    result: QueryResult::loading_from(previous.as_ref()),
                },
                Mutation::SetQuery {
                    slot: slot.clone(),
                    query: query.clone(),
                },
            ];
            (mutations, previous)
        });

        match self.transport.list(&query).await {
            Ok(entities) => {
                let ids: Vec<String> = entities.iter().map(|e| self.kind.id_of(e)).collect();
                debug!(slot = %slot, count = ids.len(), "fetch complete");
                let keyed = ids.iter().cloned().zip(entities).collect();
                self.store.apply_all(vec![
                    Mutation::SetEntities(keyed),
                    Mutation::SetResults {
                        slot,
                        result: QueryResult::loaded(ids),
                    },
                ]);
                self.record(|s| s.fetches += 1);
            }
            Err(e) => {
                warn!(slot = %slot, error = %e, status = ?e.status, "fetch failed");
                self.store.apply(Mutation::SetResults {
                    slot,
                    result: QueryResult::failed_from(previous.as_ref(), e.message, e.status),
                });
                self.record(|s| s.fetch_failures += 1);
            }
        }
    }

    /// Fetches the given ids that are absent from the store.
    ///
    /// Duplicates are collapsed, keeping first-seen order. Issues a single
    /// fetch on the configured missing-ids slot, or nothing when every id
    /// is present.
    pub(crate) async fn load_missing(&self, ids: Vec<String>) {
        let missing: Vec<String> = self.store.with(|state| {
            normalize_ids(ids)
                .into_iter()
                .filter(|id| !state.contains_entity(id))
                .collect()
        });

        if missing.is_empty() {
            debug!("no missing entities");
            return;
        }

        debug!(count = missing.len(), "loading missing entities");
        let query = self.kind.ids_query(&missing);
        self.fetch_results(self.config.missing_query_slot.clone(), query)
            .await
    }
}
