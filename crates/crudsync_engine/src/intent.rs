//! High-level intents accepted by the engine.

use crudsync_store::CrudState;
use std::time::Duration;

/// An intent dispatched to a [`SyncEngine`](crate::SyncEngine).
///
/// Each intent kind has its own concurrency policy: fetches, writes, posts,
/// deferred writes and missing loads run concurrently; delayed fetches are
/// newest-wins; start signals coalesce into one reconciliation pass; the
/// remaining intents are applied synchronously.
#[derive(Debug, Clone)]
pub enum Intent<O, I, Q> {
    /// Fetch a query slot now.
    FetchResults {
        /// Query slot name.
        slot: String,
        /// Query parameters.
        query: Q,
    },
    /// Record a query now and fetch it after `delay`, unless superseded.
    FetchResultsLater {
        /// Query slot name.
        slot: String,
        /// Query parameters.
        query: Q,
        /// Wait before fetching.
        delay: Duration,
    },
    /// Write an entity to the server.
    PutEntity {
        /// Entity id.
        id: String,
        /// New value.
        entity: O,
        /// Merge the value into the store before the server confirms it.
        local_update: bool,
    },
    /// Create an entity from a draft.
    PostEntity {
        /// Draft input.
        draft: I,
        /// Editor slot; `None` selects the default slot.
        editor: Option<String>,
        /// Resubmit automatically after a failure.
        retry: bool,
    },
    /// Save an entity locally and let reconciliation push it.
    PutEntityLater {
        /// Entity id.
        id: String,
        /// New value.
        entity: O,
    },
    /// Fetch whichever of `ids` are not in the store yet.
    LoadMissing {
        /// Deduplicated ids.
        ids: Vec<String>,
    },
    /// Arm the reconciliation loop.
    StartSync,
    /// Set one selection flag.
    SetSelected {
        /// Query slot name.
        slot: String,
        /// Entity id.
        id: String,
        /// Selection flag.
        selected: bool,
    },
    /// Clear a slot's selection.
    ClearSelected {
        /// Query slot name.
        slot: String,
    },
    /// Replace an editor's draft buffer.
    SetEntityIn {
        /// Editor slot; `None` selects the default slot.
        editor: Option<String>,
        /// Draft input.
        draft: I,
    },
    /// Replace the whole state.
    Hydrate(Box<CrudState<O, I, Q>>),
}

impl<O, I, Q> Intent<O, I, Q> {
    /// Fetch intent.
    pub fn fetch_results(slot: impl Into<String>, query: Q) -> Self {
        Intent::FetchResults {
            slot: slot.into(),
            query,
        }
    }

    /// Delayed fetch intent.
    pub fn fetch_results_later(slot: impl Into<String>, query: Q, delay: Duration) -> Self {
        Intent::FetchResultsLater {
            slot: slot.into(),
            query,
            delay,
        }
    }

    /// Optimistic write intent.
    pub fn put_entity(id: impl Into<String>, entity: O) -> Self {
        Intent::PutEntity {
            id: id.into(),
            entity,
            local_update: true,
        }
    }

    /// Create intent for the default editor slot, without retry.
    pub fn post_entity(draft: I) -> Self {
        Intent::PostEntity {
            draft,
            editor: None,
            retry: false,
        }
    }

    /// Deferred write intent.
    pub fn put_entity_later(id: impl Into<String>, entity: O) -> Self {
        Intent::PutEntityLater {
            id: id.into(),
            entity,
        }
    }

    /// Missing-ids intent.
    ///
    /// Accepts plain or optional ids. `None` entries are skipped and
    /// duplicates collapsed, keeping first-seen order.
    pub fn load_missing<S>(ids: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<Option<String>>,
    {
        Intent::LoadMissing {
            ids: normalize_ids(ids),
        }
    }

    /// Short name of the intent, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::FetchResults { .. } => "fetch_results",
            Intent::FetchResultsLater { .. } => "fetch_results_later",
            Intent::PutEntity { .. } => "put_entity",
            Intent::PostEntity { .. } => "post_entity",
            Intent::PutEntityLater { .. } => "put_entity_later",
            Intent::LoadMissing { .. } => "load_missing",
            Intent::StartSync => "start_sync",
            Intent::SetSelected { .. } => "set_selected",
            Intent::ClearSelected { .. } => "clear_selected",
            Intent::SetEntityIn { .. } => "set_entity_in",
            Intent::Hydrate(_) => "hydrate",
        }
    }
}

/// Drops `None` entries and duplicates, keeping first-seen order.
pub(crate) fn normalize_ids<S>(ids: impl IntoIterator<Item = S>) -> Vec<String>
where
    S: Into<Option<String>>,
{
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .filter_map(|id| id.into())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
