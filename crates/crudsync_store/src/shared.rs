//! Shared, observable state handle.

use crate::mutation::Mutation;
use crate::state::CrudState;
use parking_lot::{RwLock, RwLockReadGuard};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

struct Inner<O, I, Q> {
    state: RwLock<CrudState<O, I, Q>>,
    revision: watch::Sender<u64>,
}

/// A cloneable handle to one [`CrudState`] shared by concurrent processes.
///
/// Each [`Mutation`] is applied inside a single write-lock critical section,
/// so other processes only ever observe whole mutations. The lock is never
/// held across an await point. Every applied mutation bumps a revision
/// counter that views can watch to re-run their selectors.
pub struct SharedStore<O, I, Q> {
    inner: Arc<Inner<O, I, Q>>,
}

impl<O, I, Q> Clone for SharedStore<O, I, Q> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O, I, Q> Default for SharedStore<O, I, Q> {
    fn default() -> Self {
        Self::new(CrudState::default())
    }
}

impl<O, I, Q> fmt::Debug for SharedStore<O, I, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStore")
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}

impl<O, I, Q> SharedStore<O, I, Q> {
    /// Creates a store holding `state`.
    pub fn new(state: CrudState<O, I, Q>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                revision,
            }),
        }
    }

    /// Acquires a read guard for running selectors.
    ///
    /// Do not hold the guard across an await point.
    pub fn read(&self) -> RwLockReadGuard<'_, CrudState<O, I, Q>> {
        self.inner.state.read()
    }

    /// Runs `f` against the current state.
    pub fn with<R>(&self, f: impl FnOnce(&CrudState<O, I, Q>) -> R) -> R {
        f(&self.inner.state.read())
    }

    /// Applies one mutation atomically.
    pub fn apply(&self, mutation: Mutation<O, I, Q>) {
        self.inner.state.write().apply(mutation);
        self.bump();
    }

    /// Applies several mutations in one critical section.
    pub fn apply_all(&self, mutations: impl IntoIterator<Item = Mutation<O, I, Q>>) {
        {
            let mut state = self.inner.state.write();
            for mutation in mutations {
                state.apply(mutation);
            }
        }
        self.bump();
    }

    /// Derives mutations from the current state and applies them in the
    /// same critical section, so no other mutation can interleave.
    ///
    /// Returns whatever `f` returns alongside its mutations.
    pub fn update<R>(
        &self,
        f: impl FnOnce(&CrudState<O, I, Q>) -> (Vec<Mutation<O, I, Q>>, R),
    ) -> R {
        let value = {
            let mut state = self.inner.state.write();
            let (mutations, value) = f(&state);
            for mutation in mutations {
                state.apply(mutation);
            }
            value
        };
        self.bump();
        value
    }

    /// Replaces the whole state.
    pub fn hydrate(&self, state: CrudState<O, I, Q>) {
        self.apply(Mutation::Hydrate(Box::new(state)));
    }

    /// Current revision; increases by one per applied batch.
    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    /// Subscribes to revision changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|revision| *revision += 1);
    }
}

impl<O: Clone, I: Clone, Q: Clone> SharedStore<O, I, Q> {
    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> CrudState<O, I, Q> {
        self.inner.state.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::EntityStatusPatch;

    type TestStore = SharedStore<String, String, u32>;

    #[test]
    fn clones_share_state() {
        let store = TestStore::default();
        let other = store.clone();

        other.apply(Mutation::SetEntities(vec![("1".into(), "one".into())]));
        assert_eq!(store.read().entity("1").map(String::as_str), Some("one"));
    }

    #[test]
    fn revision_bumps_per_apply() {
        let store = TestStore::default();
        assert_eq!(store.revision(), 0);

        store.apply(Mutation::SetQuery {
            slot: "q".into(),
            query: 1,
        });
        assert_eq!(store.revision(), 1);

        store.apply_all(vec![
            Mutation::SetStatus {
                id: "1".into(),
                patch: EntityStatusPatch::new().busy(true),
            },
            Mutation::SetStatus {
                id: "2".into(),
                patch: EntityStatusPatch::new().busy(true),
            },
        ]);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn subscribers_see_changes() {
        let store = TestStore::default();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.apply(Mutation::ClearSelected { slot: "q".into() });
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
    }

    #[test]
    fn update_reads_then_applies_atomically() {
        let store = TestStore::default();
        store.apply(Mutation::SetEntities(vec![("1".into(), "one".into())]));

        let count = store.update(|state| {
            let ids: Vec<String> = state.entities().keys().cloned().collect();
            let mutations = ids
                .iter()
                .map(|id| Mutation::SetStatus {
                    id: id.clone(),
                    patch: EntityStatusPatch::new().modified(true),
                })
                .collect();
            (mutations, ids.len())
        });

        assert_eq!(count, 1);
        assert!(store.read().entity_status("1").modified);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn hydrate_and_snapshot() {
        let store = TestStore::default();
        store.apply(Mutation::SetEntities(vec![("1".into(), "one".into())]));

        let mut replacement = CrudState::new();
        replacement.set_query("q", 7);
        store.hydrate(replacement.clone());

        assert_eq!(store.snapshot(), replacement);
        assert_eq!(store.with(|s| s.entities().len()), 0);
    }
}
