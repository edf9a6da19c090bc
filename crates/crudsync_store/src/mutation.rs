//! State mutations.

use crate::state::CrudState;
use crate::status::{EntityStatusPatch, PostStatus, QueryResult};

/// A single atomic change to a [`CrudState`].
///
/// Every variant replaces or merges one whole field keyed by id or slot.
/// `Hydrate` is the exception: it replaces the entire state.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<O, I, Q> {
    /// Record the query parameters of a slot.
    SetQuery {
        /// Query slot name.
        slot: String,
        /// Query parameters.
        query: Q,
    },
    /// Replace the result list of a slot.
    SetResults {
        /// Query slot name.
        slot: String,
        /// New result list.
        result: QueryResult,
    },
    /// Merge entities keyed by id.
    SetEntities(Vec<(String, O)>),
    /// Merge a partial status into an entity's status.
    SetStatus {
        /// Entity id.
        id: String,
        /// Fields to merge.
        patch: EntityStatusPatch,
    },
    /// Set one selection flag in a slot.
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
    /// Replace the post status of an editor slot.
    SetPostStatus {
        /// Editor slot.
        editor: String,
        /// New post status.
        status: PostStatus<O, I>,
    },
    /// Replace the draft buffer of an editor slot.
    SetEntityIn {
        /// Editor slot.
        editor: String,
        /// Draft input.
        draft: I,
    },
    /// Replace the whole state.
    Hydrate(Box<CrudState<O, I, Q>>),
}

impl<O, I, Q> Mutation<O, I, Q> {
    /// Short name of the mutation, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::SetQuery { .. } => "set_query",
            Mutation::SetResults { .. } => "set_results",
            Mutation::SetEntities(_) => "set_entities",
            Mutation::SetStatus { .. } => "set_status",
            Mutation::SetSelected { .. } => "set_selected",
            Mutation::ClearSelected { .. } => "clear_selected",
            Mutation::SetPostStatus { .. } => "set_post_status",
            Mutation::SetEntityIn { .. } => "set_entity_in",
            Mutation::Hydrate(_) => "hydrate",
        }
    }
}
