//! Read projections over a [`CrudState`].
//!
//! Selectors are pure and synchronous. Absence is never an error: a missing
//! entity status reads as "not busy", a missing selection reads as empty.

use crate::state::CrudState;
use crate::status::{EntityStatus, PostStatus, QueryResult, DEFAULT_EDITOR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An entity joined with its sync status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityWithStatus<O> {
    /// The entity value.
    pub entity: O,
    /// Its sync status.
    #[serde(flatten)]
    pub status: EntityStatus,
}

/// A query slot's results joined with live entities.
///
/// `loading`, `error` and `status` are passed through from the slot's
/// [`QueryResult`]. Ids not yet present in the store are dropped from
/// `results`, so partial results are expected while loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResults<O, Q> {
    /// Query parameters of the slot.
    pub query: Q,
    /// A fetch for the slot is in flight.
    pub loading: bool,
    /// Message of the last failed fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Status code of the last failed fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Resolvable entities in result order.
    pub results: Vec<EntityWithStatus<O>>,
    /// Selection flags of the slot.
    pub selected: BTreeMap<String, bool>,
}

impl<O, I, Q> CrudState<O, I, Q> {
    /// Query parameters recorded for a slot.
    pub fn query(&self, slot: &str) -> Option<&Q> {
        self.queries.get(slot)
    }

    /// All recorded queries by slot.
    pub fn all_queries(&self) -> &BTreeMap<String, Q> {
        &self.queries
    }

    /// Raw result list of a slot.
    pub fn results(&self, slot: &str) -> Option<&QueryResult> {
        self.results.get(slot)
    }

    /// All result lists by slot.
    pub fn all_results(&self) -> &BTreeMap<String, QueryResult> {
        &self.results
    }

    /// All entities by id.
    pub fn entities(&self) -> &BTreeMap<String, O> {
        &self.entities
    }

    /// A single entity.
    pub fn entity(&self, id: &str) -> Option<&O> {
        self.entities.get(id)
    }

    /// Returns true if the entity is present in the store.
    pub fn contains_entity(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Status of an entity, `{busy: false}` when none was recorded.
    pub fn entity_status(&self, id: &str) -> EntityStatus {
        self.entity_status.get(id).cloned().unwrap_or_default()
    }

    /// All recorded entity statuses by id.
    pub fn all_entity_status(&self) -> &BTreeMap<String, EntityStatus> {
        &self.entity_status
    }

    /// Raw selection map of a slot.
    pub fn selected(&self, slot: &str) -> Option<&BTreeMap<String, bool>> {
        self.selected.get(slot)
    }

    /// Ids currently selected in a slot.
    pub fn selected_list(&self, slot: &str) -> Vec<String> {
        self.selected
            .get(slot)
            .map(|selection| {
                selection
                    .iter()
                    .filter(|(_, selected)| **selected)
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Draft buffer of an editor slot (`None` selects the default slot).
    pub fn entity_in(&self, editor: Option<&str>) -> Option<&I> {
        self.entities_in.get(editor.unwrap_or(DEFAULT_EDITOR))
    }

    /// Post status of an editor slot (`None` selects the default slot).
    pub fn post_status(&self, editor: Option<&str>) -> Option<&PostStatus<O, I>> {
        self.post_status.get(editor.unwrap_or(DEFAULT_EDITOR))
    }

    /// All post statuses by editor slot.
    pub fn all_post_status(&self) -> &BTreeMap<String, PostStatus<O, I>> {
        &self.post_status
    }
}

impl<O: Clone, I, Q: Clone> CrudState<O, I, Q> {
    /// Joins a slot's result ids with live entities and their status.
    ///
    /// Returns `None` unless both a query and a result were recorded for
    /// the slot.
    pub fn query_results(&self, slot: &str) -> Option<QueryResults<O, Q>> {
        let query = self.queries.get(slot)?;
        let result = self.results.get(slot)?;

        let results = result
            .ids
            .iter()
            .filter_map(|id| {
                self.entities.get(id).map(|entity| EntityWithStatus {
                    entity: entity.clone(),
                    status: self.entity_status(id),
                })
            })
            .collect();

        Some(QueryResults {
            query: query.clone(),
            loading: result.loading,
            error: result.error.clone(),
            status: result.status,
            results,
            selected: self.selected.get(slot).cloned().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::EntityStatusPatch;

    #[derive(Debug, Clone, PartialEq)]
    struct Dummy {
        id: String,
        name: String,
    }

    fn dummy(id: &str, name: &str) -> (String, Dummy) {
        (
            id.to_string(),
            Dummy {
                id: id.to_string(),
                name: name.to_string(),
            },
        )
    }

    fn test_state() -> CrudState<Dummy, String, u32> {
        let mut state = CrudState::new();
        state.set_query("query1", 3);
        state.set_results("query1", QueryResult::loaded(vec!["1".into(), "2".into()]));
        state.set_entities(vec![dummy("1", "dummy1"), dummy("2", "dummy2")]);
        state.set_status("1", &EntityStatusPatch::new().busy(true));
        state.set_status("2", &EntityStatusPatch::new().busy(false));
        state.set_post_status("query1", PostStatus::default());
        state
    }

    #[test]
    fn select_query() {
        assert_eq!(test_state().query("query1"), Some(&3));
        assert_eq!(test_state().query("other"), None);
    }

    #[test]
    fn select_results() {
        let state = test_state();
        assert_eq!(
            state.results("query1"),
            Some(&QueryResult::loaded(vec!["1".into(), "2".into()]))
        );
        assert_eq!(state.all_results().len(), 1);
    }

    #[test]
    fn select_entity_status() {
        let state = test_state();
        assert_eq!(state.entity_status("1"), EntityStatus::new(true));
        assert_eq!(state.entity_status("missing"), EntityStatus::new(false));
    }

    #[test]
    fn select_entity() {
        let state = test_state();
        assert_eq!(state.entity("2").map(|d| d.name.as_str()), Some("dummy2"));
        assert!(state.entity("3").is_none());
        assert!(state.contains_entity("1"));
    }

    #[test]
    fn selected_list_only_true_flags() {
        let mut state = test_state();
        assert!(state.selected_list("query1").is_empty());

        state.set_selected("query1", "2", true);
        state.set_selected("query1", "1", false);
        state.set_selected("query1", "3", true);

        assert_eq!(state.selected_list("query1"), vec!["2", "3"]);
    }

    #[test]
    fn editor_selectors_default_slot() {
        let mut state = test_state();
        state.set_entity_in(DEFAULT_EDITOR, "draft".to_string());

        assert_eq!(state.entity_in(None).map(String::as_str), Some("draft"));
        assert!(state.entity_in(Some("other")).is_none());
        assert!(state.post_status(None).is_none());
        assert!(state.post_status(Some("query1")).is_some());
        assert_eq!(state.all_post_status().len(), 1);
    }

    #[test]
    fn query_results_requires_query_and_result() {
        let mut state: CrudState<Dummy, String, u32> = CrudState::new();
        assert!(state.query_results("query1").is_none());

        state.set_query("query1", 1);
        assert!(state.query_results("query1").is_none());

        state.set_results("query1", QueryResult::default());
        assert!(state.query_results("query1").is_some());

        let mut only_result: CrudState<Dummy, String, u32> = CrudState::new();
        only_result.set_results("query1", QueryResult::default());
        assert!(only_result.query_results("query1").is_none());
    }

    #[test]
    fn query_results_join_drops_unresolved_ids() {
        let mut state = test_state();
        state.set_results(
            "query1",
            QueryResult {
                ids: vec!["2".into(), "missing".into(), "1".into()],
                loading: true,
                error: Some("stale".into()),
                status: Some(502),
            },
        );
        state.set_selected("query1", "1", true);

        let joined = state.query_results("query1").unwrap();
        assert_eq!(joined.query, 3);
        assert!(joined.loading);
        assert_eq!(joined.error.as_deref(), Some("stale"));
        assert_eq!(joined.status, Some(502));

        let ids: Vec<&str> = joined.results.iter().map(|r| r.entity.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert!(!joined.results[0].status.busy);
        assert!(joined.results[1].status.busy);
        assert_eq!(joined.selected.get("1"), Some(&true));
    }
}
