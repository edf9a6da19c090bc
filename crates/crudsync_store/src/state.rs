//! Normalized state of one entity kind.

use crate::mutation::Mutation;
use crate::status::{EntityStatus, EntityStatusPatch, PostStatus, QueryResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Client-side state of one entity kind.
///
/// Holds confirmed and optimistic entities keyed by id, their sync status,
/// the last query and result of every query slot, per-slot selections,
/// per-editor drafts and the post status of every editor slot.
///
/// # Invariants
///
/// - Entities are only ever merged in; no operation removes an id
/// - Every change replaces or merges one whole field keyed by id or slot
/// - At most one post status exists per editor slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "O: Serialize, I: Serialize, Q: Serialize",
    deserialize = "O: Deserialize<'de>, I: Deserialize<'de>, Q: Deserialize<'de>"
))]
pub struct CrudState<O, I, Q> {
    #[serde(default)]
    pub(crate) queries: BTreeMap<String, Q>,
    #[serde(default)]
    pub(crate) results: BTreeMap<String, QueryResult>,
    #[serde(default)]
    pub(crate) entities: BTreeMap<String, O>,
    #[serde(default)]
    pub(crate) entity_status: BTreeMap<String, EntityStatus>,
    #[serde(default)]
    pub(crate) selected: BTreeMap<String, BTreeMap<String, bool>>,
    #[serde(default)]
    pub(crate) entities_in: BTreeMap<String, I>,
    #[serde(default)]
    pub(crate) post_status: BTreeMap<String, PostStatus<O, I>>,
}

impl<O, I, Q> Default for CrudState<O, I, Q> {
    fn default() -> Self {
        Self {
            queries: BTreeMap::new(),
            results: BTreeMap::new(),
            entities: BTreeMap::new(),
            entity_status: BTreeMap::new(),
            selected: BTreeMap::new(),
            entities_in: BTreeMap::new(),
            post_status: BTreeMap::new(),
        }
    }
}

impl<O, I, Q> CrudState<O, I, Q> {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
            && self.results.is_empty()
            && self.entities.is_empty()
            && self.entity_status.is_empty()
            && self.selected.is_empty()
            && self.entities_in.is_empty()
            && self.post_status.is_empty()
    }

    /// Applies a single mutation.
    pub fn apply(&mut self, mutation: Mutation<O, I, Q>) {
        match mutation {
            Mutation::SetQuery { slot, query } => self.set_query(slot, query),
            Mutation::SetResults { slot, result } => self.set_results(slot, result),
            Mutation::SetEntities(entities) => self.set_entities(entities),
            Mutation::SetStatus { id, patch } => self.set_status(id, &patch),
            Mutation::SetSelected { slot, id, selected } => self.set_selected(slot, id, selected),
            Mutation::ClearSelected { slot } => self.clear_selected(slot),
            Mutation::SetPostStatus { editor, status } => self.set_post_status(editor, status),
            Mutation::SetEntityIn { editor, draft } => self.set_entity_in(editor, draft),
            Mutation::Hydrate(state) => *self = *state,
        }
    }

    /// Records the query parameters of a slot, replacing any previous ones.
    pub fn set_query(&mut self, slot: impl Into<String>, query: Q) {
        self.queries.insert(slot.into(), query);
    }

    /// Replaces the result list of a slot.
    pub fn set_results(&mut self, slot: impl Into<String>, result: QueryResult) {
        self.results.insert(slot.into(), result);
    }

    /// Merges entities keyed by id. Ids absent from `entities` are kept.
    pub fn set_entities<E>(&mut self, entities: E)
    where
        E: IntoIterator<Item = (String, O)>,
    {
        self.entities.extend(entities);
    }

    /// Merges a partial status into the status of `id`.
    pub fn set_status(&mut self, id: impl Into<String>, patch: &EntityStatusPatch) {
        let status = self.entity_status.entry(id.into()).or_default();
        *status = status.merged(patch);
    }

    /// Sets the selection flag of `id` in a slot's selection.
    pub fn set_selected(&mut self, slot: impl Into<String>, id: impl Into<String>, selected: bool) {
        self.selected
            .entry(slot.into())
            .or_default()
            .insert(id.into(), selected);
    }

    /// Replaces a slot's selection with an empty one.
    pub fn clear_selected(&mut self, slot: impl Into<String>) {
        self.selected.insert(slot.into(), BTreeMap::new());
    }

    /// Replaces the post status of an editor slot.
    pub fn set_post_status(&mut self, editor: impl Into<String>, status: PostStatus<O, I>) {
        self.post_status.insert(editor.into(), status);
    }

    /// Replaces the draft buffer of an editor slot.
    pub fn set_entity_in(&mut self, editor: impl Into<String>, draft: I) {
        self.entities_in.insert(editor.into(), draft);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::DEFAULT_EDITOR;

    type TestState = CrudState<String, String, u32>;

    fn entities(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect()
    }

    #[test]
    fn initial_state_is_empty() {
        let state = TestState::new();
        assert!(state.is_empty());
        assert_eq!(state, TestState::default());
    }

    #[test]
    fn set_query_replaces_slot() {
        let mut state = TestState::new();
        state.apply(Mutation::SetQuery {
            slot: "query1".into(),
            query: 3,
        });
        state.apply(Mutation::SetQuery {
            slot: "query1".into(),
            query: 4,
        });

        assert_eq!(state.queries.len(), 1);
        assert_eq!(state.queries.get("query1"), Some(&4));
    }

    #[test]
    fn set_results_replaces_slot() {
        let mut state = TestState::new();
        state.apply(Mutation::SetResults {
            slot: "query1".into(),
            result: QueryResult::loaded(vec!["1".into(), "2".into()]),
        });

        let result = state.results.get("query1").unwrap();
        assert_eq!(result.ids, vec!["1".to_string(), "2".to_string()]);
        assert!(!result.loading);
    }

    #[test]
    fn set_entities_merges_without_removing() {
        let mut state = TestState::new();
        state.set_entities(entities(&[("1", "old dummy1"), ("3", "dummy3")]));

        state.apply(Mutation::SetEntities(entities(&[
            ("1", "dummy1"),
            ("2", "dummy2"),
        ])));

        let expected: BTreeMap<String, String> =
            entities(&[("1", "dummy1"), ("2", "dummy2"), ("3", "dummy3")])
                .into_iter()
                .collect();
        assert_eq!(state.entities, expected);
    }

    #[test]
    fn replayed_insert_does_not_duplicate() {
        let mut state = TestState::new();
        state.set_entities(entities(&[("9", "created")]));
        state.set_entities(entities(&[("9", "created")]));

        assert_eq!(state.entities.len(), 1);
    }

    #[test]
    fn set_status_merges_partial() {
        let mut state = TestState::new();
        state.set_status("1", &EntityStatusPatch::new().busy(true));
        state.set_status("3", &EntityStatusPatch::new().busy(false));

        state.apply(Mutation::SetStatus {
            id: "3".into(),
            patch: EntityStatusPatch::new().busy(true),
        });

        assert_eq!(state.entity_status.get("1"), Some(&EntityStatus::new(true)));
        assert_eq!(state.entity_status.get("3"), Some(&EntityStatus::new(true)));
    }

    #[test]
    fn set_status_creates_on_first_reference() {
        let mut state = TestState::new();
        state.set_status("5", &EntityStatusPatch::new().modified(true));

        let status = state.entity_status.get("5").unwrap();
        assert!(status.modified);
        assert!(!status.busy);
    }

    #[test]
    fn selection_set_and_clear() {
        let mut state = TestState::new();
        state.set_selected("list", "1", true);
        state.set_selected("list", "2", true);
        state.set_selected("list", "2", false);

        let selection = state.selected.get("list").unwrap();
        assert_eq!(selection.get("1"), Some(&true));
        assert_eq!(selection.get("2"), Some(&false));

        state.apply(Mutation::ClearSelected {
            slot: "list".into(),
        });
        assert!(state.selected.get("list").unwrap().is_empty());
    }

    #[test]
    fn post_status_replaces_previous_entirely() {
        let mut state = TestState::new();
        state.set_post_status(
            DEFAULT_EDITOR,
            PostStatus::failed("offline", Some(503), "draft".into(), Some(10)),
        );
        state.apply(Mutation::SetPostStatus {
            editor: DEFAULT_EDITOR.into(),
            status: PostStatus::pending(),
        });

        let status = state.post_status.get(DEFAULT_EDITOR).unwrap();
        assert!(status.busy);
        assert_eq!(status.error, None);
        assert_eq!(status.draft, None);
        assert_eq!(status.retry_at, None);
    }

    #[test]
    fn set_entity_in_per_editor() {
        let mut state = TestState::new();
        state.apply(Mutation::SetEntityIn {
            editor: "a".into(),
            draft: "first".into(),
        });
        state.set_entity_in("b", "second".to_string());

        assert_eq!(state.entities_in.get("a").map(String::as_str), Some("first"));
        assert_eq!(state.entities_in.get("b").map(String::as_str), Some("second"));
    }

    #[test]
    fn hydrate_replaces_everything() {
        let mut state = TestState::new();
        state.set_entities(entities(&[("1", "one")]));
        state.set_query("q", 1);

        let mut replacement = TestState::new();
        replacement.set_entities(entities(&[("2", "two")]));

        state.apply(Mutation::Hydrate(Box::new(replacement.clone())));
        assert_eq!(state, replacement);
        assert!(!state.entities.contains_key("1"));
        assert!(state.queries.is_empty());
    }
}
