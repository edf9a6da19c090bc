//! Fixtures shared by the unit tests.

use crate::engine::SyncEngine;
use crate::kind::EntityKind;
use crate::transport::MockTransport;
use crate::EngineConfig;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Note {
    pub(crate) id: String,
    pub(crate) title: String,
}

pub(crate) type NoteTransport = MockTransport<Note, String, Vec<String>>;

pub(crate) fn note(id: &str, title: &str) -> Note {
    Note {
        id: id.to_string(),
        title: title.to_string(),
    }
}

pub(crate) fn kind() -> EntityKind<Note, Vec<String>> {
    EntityKind::new("note", |n: &Note| n.id.clone(), |ids: &[String]| ids.to_vec())
}

pub(crate) fn engine(transport: NoteTransport) -> SyncEngine<NoteTransport> {
    SyncEngine::builder(kind(), transport)
        .with_config(EngineConfig::default())
        .start()
}

/// Lets every ready task run without advancing time.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
