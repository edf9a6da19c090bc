//! Writes of existing entities, immediate and deferred.

use crate::engine::Core;
use crate::transport::CrudTransport;
use crudsync_store::{EntityStatusPatch, Mutation};
use tracing::{debug, warn};

impl<T: CrudTransport> Core<T> {
    /// First half of a write: optional optimistic merge, then busy.
    ///
    /// Runs before the first suspension point so an overlapping
    /// reconciliation pass already sees the entity as busy.
    pub(crate) fn begin_put(&self, id: &str, entity: &T::Entity, local_update: bool) {
        let mut mutations = Vec::with_capacity(2);
        if local_update {
            mutations.push(Mutation::SetEntities(vec![(id.to_string(), entity.clone())]));
        }
        mutations.push(Mutation::SetStatus {
            id: id.to_string(),
            patch: EntityStatusPatch::new().busy(true),
        });
        self.store.apply_all(mutations);
    }

    /// Second half of a write: the server call and its outcome.
    ///
    /// Success clears busy, modified and any error. Failure clears busy and
    /// records the error but leaves `modified` alone, so an entity awaiting
    /// reconciliation stays flagged. A failed write is never retried here.
    pub(crate) async fn finish_put(&self, id: String, entity: T::Entity) {
        match self.transport.update(&id, &entity).await {
            Ok(_) => {
                debug!(id = %id, "write confirmed");
                self.store.apply(Mutation::SetStatus {
                    id,
                    patch: EntityStatusPatch::confirmed(),
                });
                self.record(|s| s.writes += 1);
            }
            Err(e) => {
                warn!(id = %id, error = %e, status = ?e.status, "write failed");
                self.store.apply(Mutation::SetStatus {
                    id,
                    patch: EntityStatusPatch::failed(e.message, e.status),
                });
                self.record(|s| s.write_failures += 1);
            }
        }
    }

    /// Saves an entity locally, flags it modified and arms reconciliation.
    ///
    /// Busy and error are left untouched.
    pub(crate) fn put_later(&self, id: String, entity: T::Entity) {
        self.store.apply_all(vec![
            Mutation::SetEntities(vec![(id.clone(), entity)]),
            Mutation::SetStatus {
                id: id.clone(),
                patch: EntityStatusPatch::new().modified(true),
            },
        ]);
        debug!(id = %id, "entity modified locally");
        self.signal_sync_quietly();
    }
}

#[cfg(test)]
mod tests {
    use crate::error::TransportError;
    use crate::intent::Intent;
    use crate::testing::{engine, note, settle, NoteTransport};
    use crudsync_store::{EntityStatus, EntityStatusPatch, Mutation};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn optimistic_put_then_confirm() {
        let transport = NoteTransport::new().with_latency(Duration::from_secs(1));
        let engine = engine(transport);

        engine
            .dispatch(Intent::put_entity("1", note("1", "draft title")))
            .unwrap();

        assert_eq!(engine.entity("1"), Some(note("1", "draft title")));
        assert!(engine.entity_status("1").busy);

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(engine.entity_status("1"), EntityStatus::new(false));
        assert_eq!(
            engine.transport().update_calls(),
            vec![("1".to_string(), note("1", "draft title"))]
        );
        assert_eq!(engine.stats().writes, 1);
    }

    #[tokio::test]
    async fn confirmed_put_clears_modified_and_error() {
        let engine = engine(NoteTransport::new());
        engine.store().apply(Mutation::SetStatus {
            id: "1".into(),
            patch: EntityStatusPatch::new()
                .modified(true)
                .error(Some("old".into()))
                .status(Some(500)),
        });

        engine.put_entity("1", note("1", "x"), true).await;

        assert_eq!(engine.entity_status("1"), EntityStatus::new(false));
    }

    #[tokio::test]
    async fn non_local_put_does_not_touch_entity() {
        let engine = engine(NoteTransport::new());

        engine.put_entity("1", note("1", "server"), false).await;

        assert!(engine.entity("1").is_none());
        assert_eq!(engine.transport().update_calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_put_keeps_modified() {
        let transport = NoteTransport::new();
        transport.push_update(Err(TransportError::with_status("conflict", 409)));
        let engine = engine(transport);
        engine.store().apply(Mutation::SetStatus {
            id: "1".into(),
            patch: EntityStatusPatch::new().modified(true),
        });

        engine.put_entity("1", note("1", "x"), true).await;

        let status = engine.entity_status("1");
        assert!(!status.busy);
        assert!(status.modified);
        assert_eq!(status.error.as_deref(), Some("conflict"));
        assert_eq!(status.status, Some(409));
        assert_eq!(engine.stats().write_failures, 1);
    }

    #[tokio::test]
    async fn failed_put_does_not_schedule_retry() {
        let transport = NoteTransport::new();
        transport.set_update(Err(TransportError::new("offline")));
        let engine = engine(transport);

        engine.put_entity("1", note("1", "x"), true).await;
        settle().await;

        let status = engine.entity_status("1");
        assert!(!status.modified);
        assert_eq!(engine.transport().update_calls().len(), 1);
    }

    #[tokio::test]
    async fn put_later_marks_modified_without_touching_busy() {
        let engine = engine(NoteTransport::new());
        engine.store().apply(Mutation::SetStatus {
            id: "1".into(),
            patch: EntityStatusPatch::new()
                .busy(true)
                .error(Some("previous".into())),
        });

        engine.put_entity_later("1", note("1", "offline edit"));

        assert_eq!(engine.entity("1"), Some(note("1", "offline edit")));
        let status = engine.entity_status("1");
        assert!(status.modified);
        assert!(status.busy);
        assert_eq!(status.error.as_deref(), Some("previous"));
        assert!(engine.transport().update_calls().is_empty());
    }
}
