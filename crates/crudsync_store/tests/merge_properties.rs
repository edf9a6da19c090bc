//! Property tests for store merge semantics.

use crudsync_store::{CrudState, EntityStatus, EntityStatusPatch, Mutation};
use proptest::prelude::*;
use std::collections::BTreeMap;

type TestState = CrudState<String, String, u32>;

fn payload() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[0-9]{1,2}", "[a-z]{1,6}"), 0..8)
}

fn patch() -> impl Strategy<Value = EntityStatusPatch> {
    (
        prop::option::of(any::<bool>()),
        prop::option::of(any::<bool>()),
        prop::option::of(prop::option::of("[a-z]{1,4}")),
        prop::option::of(prop::option::of(100u16..600)),
    )
        .prop_map(|(busy, modified, error, status)| EntityStatusPatch {
            busy,
            modified,
            error,
            status,
        })
}

proptest! {
    #[test]
    fn set_entities_is_union_merge(payloads in prop::collection::vec(payload(), 0..6)) {
        let mut state = TestState::new();
        let mut expected = BTreeMap::new();

        for payload in payloads {
            for (id, value) in &payload {
                expected.insert(id.clone(), value.clone());
            }
            state.apply(Mutation::SetEntities(payload));
        }

        prop_assert_eq!(state.entities(), &expected);
    }

    #[test]
    fn set_status_merges_field_by_field(patches in prop::collection::vec(patch(), 0..8)) {
        let mut state = TestState::new();
        let mut expected = EntityStatus::default();

        for patch in patches {
            if let Some(busy) = patch.busy {
                expected.busy = busy;
            }
            if let Some(modified) = patch.modified {
                expected.modified = modified;
            }
            if let Some(error) = patch.error.clone() {
                expected.error = error;
            }
            if let Some(status) = patch.status {
                expected.status = status;
            }
            state.apply(Mutation::SetStatus { id: "1".into(), patch });
        }

        prop_assert_eq!(state.entity_status("1"), expected);
        prop_assert!(state.all_entity_status().len() <= 1);
    }
}
