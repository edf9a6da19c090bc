//! Sync engine handle, builder and intent dispatch.

use crate::clock::{Clock, RuntimeClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::intent::{normalize_ids, Intent};
use crate::kind::EntityKind;
use crate::reconcile;
use crate::transport::CrudTransport;
use crudsync_store::{
    load_snapshot, save_snapshot, CrudState, EntityStatus, Mutation, QueryResults, SharedStore,
    DEFAULT_EDITOR,
};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, debug_span, Instrument};

/// State type managed by an engine over transport `T`.
pub type EngineState<T> = CrudState<
    <T as CrudTransport>::Entity,
    <T as CrudTransport>::Input,
    <T as CrudTransport>::Query,
>;

/// Shared store type managed by an engine over transport `T`.
pub type EngineStore<T> = SharedStore<
    <T as CrudTransport>::Entity,
    <T as CrudTransport>::Input,
    <T as CrudTransport>::Query,
>;

/// Intent type accepted by an engine over transport `T`.
pub type EngineIntent<T> = Intent<
    <T as CrudTransport>::Entity,
    <T as CrudTransport>::Input,
    <T as CrudTransport>::Query,
>;

/// Counters of engine activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Fetches that completed successfully.
    pub fetches: u64,
    /// Fetches that failed.
    pub fetch_failures: u64,
    /// Writes confirmed by the server.
    pub writes: u64,
    /// Writes that failed.
    pub write_failures: u64,
    /// Inserts confirmed by the server.
    pub posts: u64,
    /// Inserts that failed.
    pub post_failures: u64,
    /// Delayed fetches abandoned for a newer one.
    pub superseded_fetches: u64,
    /// Reconciliation passes run.
    pub reconcile_passes: u64,
    /// Drafts resubmitted by reconciliation.
    pub resubmissions: u64,
}

/// State shared by the engine handle, the reconciliation loop and every
/// spawned process.
pub(crate) struct Core<T: CrudTransport> {
    pub(crate) kind: EntityKind<T::Entity, T::Query>,
    pub(crate) transport: Arc<T>,
    pub(crate) store: EngineStore<T>,
    pub(crate) config: EngineConfig,
    pub(crate) clock: Arc<dyn Clock>,
    stats: RwLock<EngineStats>,
    sync_tx: mpsc::UnboundedSender<()>,
    delayed_fetch: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl<T: CrudTransport> Core<T> {
    pub(crate) fn record(&self, f: impl FnOnce(&mut EngineStats)) {
        f(&mut self.stats.write());
    }

    /// Sends a start signal to the reconciliation loop.
    pub(crate) fn signal_sync(&self) -> EngineResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(EngineError::Shutdown);
        }
        self.sync_tx.send(()).map_err(|_| EngineError::Shutdown)
    }

    /// Sends a start signal from inside a process, where there is no caller
    /// to report a shutdown to.
    pub(crate) fn signal_sync_quietly(&self) {
        if self.signal_sync().is_err() {
            debug!(kind = %self.kind.name(), "start signal dropped, engine shut down");
        }
    }

    fn span(&self, process: &'static str) -> tracing::Span {
        debug_span!("crudsync", kind = %self.kind.name(), process)
    }

    pub(crate) fn spawn_fetch(self: &Arc<Self>, slot: String, query: T::Query) {
        let core = Arc::clone(self);
        let span = self.span("fetch");
        tokio::spawn(async move { core.fetch_results(slot, query).await }.instrument(span));
    }

    /// Marks the entity busy now and finishes the write in the background.
    pub(crate) fn spawn_put(self: &Arc<Self>, id: String, entity: T::Entity, local_update: bool) {
        self.begin_put(&id, &entity, local_update);
        let core = Arc::clone(self);
        let span = self.span("put");
        tokio::spawn(async move { core.finish_put(id, entity).await }.instrument(span));
    }

    /// Marks the editor slot busy now and finishes the post in the background.
    pub(crate) fn spawn_post(self: &Arc<Self>, draft: T::Input, editor: String, retry: bool) {
        let refetch = self.begin_post(&editor);
        let core = Arc::clone(self);
        let span = self.span("post");
        tokio::spawn(
            async move { core.finish_post(draft, editor, retry, refetch).await }.instrument(span),
        );
    }

    fn spawn_load_missing(self: &Arc<Self>, ids: Vec<String>) {
        let core = Arc::clone(self);
        let span = self.span("load_missing");
        tokio::spawn(async move { core.load_missing(ids).await }.instrument(span));
    }

    /// Records the query now, then fetches after `delay` unless a newer
    /// delayed fetch arrives first.
    pub(crate) fn schedule_fetch_later(
        self: &Arc<Self>,
        slot: String,
        query: T::Query,
        delay: Duration,
    ) {
        self.store.apply(Mutation::SetQuery {
            slot: slot.clone(),
            query: query.clone(),
        });

        let mut pending = self.delayed_fetch.lock();
        if let Some(previous) = pending.take() {
            if !previous.is_finished() {
                previous.abort();
                self.record(|s| s.superseded_fetches += 1);
                debug!(kind = %self.kind.name(), "delayed fetch superseded");
            }
        }

        let core = Arc::clone(self);
        let span = self.span("fetch_later");
        *pending = Some(tokio::spawn(
            async move {
                tokio::time::sleep(delay).await;
                // The fetch runs in its own task so superseding can no
                // longer cancel it once the wait is over.
                core.spawn_fetch(slot, query);
            }
            .instrument(span),
        ));
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        if let Some(pending) = self.delayed_fetch.lock().take() {
            pending.abort();
        }
    }
}

/// Builder for a [`SyncEngine`].
pub struct EngineBuilder<T: CrudTransport> {
    kind: EntityKind<T::Entity, T::Query>,
    transport: T,
    config: EngineConfig,
    clock: Option<Arc<dyn Clock>>,
    store: Option<EngineStore<T>>,
}

impl<T: CrudTransport> EngineBuilder<T> {
    /// Sets the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the clock used for retry deadlines.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Uses an existing store instead of a fresh one.
    pub fn with_store(mut self, store: EngineStore<T>) -> Self {
        self.store = Some(store);
        self
    }

    /// Starts with `state` instead of an empty state.
    pub fn with_state(mut self, state: EngineState<T>) -> Self {
        self.store = Some(SharedStore::new(state));
        self
    }

    /// Builds the engine and spawns its reconciliation loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> SyncEngine<T> {
        let (sync_tx, sync_rx) = mpsc::unbounded_channel();
        let core = Arc::new(Core {
            kind: self.kind,
            transport: Arc::new(self.transport),
            store: self.store.unwrap_or_default(),
            config: self.config,
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(RuntimeClock::new())),
            stats: RwLock::new(EngineStats::default()),
            sync_tx,
            delayed_fetch: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        });

        let span = core.span("reconcile");
        let reconciler = tokio::spawn(reconcile::run(Arc::clone(&core), sync_rx).instrument(span));
        debug!(kind = %core.kind.name(), "sync engine started");

        SyncEngine {
            core,
            reconciler: Mutex::new(Some(reconciler)),
        }
    }
}

/// Keeps a normalized store of one entity kind consistent with a backend.
///
/// The engine turns intents into store mutations and transport calls:
/// fetches populate query slots, writes and posts are applied optimistically
/// and confirmed asynchronously, and a background reconciliation loop pushes
/// modified entities and resubmits failed posts that opted into retry.
///
/// Transport failures never surface as errors here; they are recorded in
/// the `error`/`status` fields read through the store's selectors.
///
/// # Example
///
/// ```
/// use crudsync_engine::{EntityKind, MockTransport, SyncEngine};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let kind = EntityKind::new("note", |n: &String| n.clone(), |ids: &[String]| ids.to_vec());
/// let transport: MockTransport<String, String, Vec<String>> = MockTransport::new();
/// transport.set_list(Ok(vec!["a".into(), "b".into()]));
///
/// let engine = SyncEngine::builder(kind, transport).start();
/// engine.fetch_results("all", vec![]).await;
///
/// let results = engine.query_results("all").unwrap();
/// assert_eq!(results.results.len(), 2);
/// # }
/// ```
pub struct SyncEngine<T: CrudTransport> {
    core: Arc<Core<T>>,
    reconciler: Mutex<Option<JoinHandle<()>>>,
}

impl<T: CrudTransport> SyncEngine<T> {
    /// Creates a builder for an engine over `transport`.
    pub fn builder(kind: EntityKind<T::Entity, T::Query>, transport: T) -> EngineBuilder<T> {
        EngineBuilder {
            kind,
            transport,
            config: EngineConfig::default(),
            clock: None,
            store: None,
        }
    }

    /// Builds an engine with the default configuration and starts it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(kind: EntityKind<T::Entity, T::Query>, transport: T) -> Self {
        Self::builder(kind, transport).start()
    }

    /// The entity kind this engine manages.
    pub fn kind(&self) -> &EntityKind<T::Entity, T::Query> {
        &self.core.kind
    }

    /// The transport used by this engine.
    pub fn transport(&self) -> &T {
        &self.core.transport
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    /// The shared store; run selectors through [`SharedStore::read`].
    pub fn store(&self) -> &EngineStore<T> {
        &self.core.store
    }

    /// Gets the current stats.
    pub fn stats(&self) -> EngineStats {
        self.core.stats.read().clone()
    }

    /// Extracts the id of an entity.
    pub fn entity_id(&self, entity: &T::Entity) -> String {
        self.core.kind.id_of(entity)
    }

    /// Dispatches an intent according to its concurrency policy.
    ///
    /// Process intents are spawned and return immediately. Only
    /// [`Intent::StartSync`] can fail, when the engine has been shut down.
    pub fn dispatch(&self, intent: EngineIntent<T>) -> EngineResult<()> {
        debug!(kind = %self.core.kind.name(), intent = intent.name(), "dispatch");
        match intent {
            Intent::FetchResults { slot, query } => self.core.spawn_fetch(slot, query),
            Intent::FetchResultsLater { slot, query, delay } => {
                self.core.schedule_fetch_later(slot, query, delay)
            }
            Intent::PutEntity {
                id,
                entity,
                local_update,
            } => self.core.spawn_put(id, entity, local_update),
            Intent::PostEntity {
                draft,
                editor,
                retry,
            } => self
                .core
                .spawn_post(draft, editor.unwrap_or_else(default_editor), retry),
            Intent::PutEntityLater { id, entity } => self.core.put_later(id, entity),
            Intent::LoadMissing { ids } => self.core.spawn_load_missing(ids),
            Intent::StartSync => return self.core.signal_sync(),
            Intent::SetSelected { slot, id, selected } => self.set_selected(slot, id, selected),
            Intent::ClearSelected { slot } => self.clear_selected(slot),
            Intent::SetEntityIn { editor, draft } => self.set_entity_in(editor, draft),
            Intent::Hydrate(state) => self.hydrate(*state),
        }
        Ok(())
    }

    /// Fetches a query slot and waits for the result.
    pub async fn fetch_results(&self, slot: impl Into<String>, query: T::Query) {
        self.core
            .fetch_results(slot.into(), query)
            .instrument(self.core.span("fetch"))
            .await
    }

    /// Records a query now and fetches it after `delay`.
    ///
    /// A newer delayed fetch issued before the wait elapses abandons this
    /// one entirely.
    pub fn fetch_results_later(&self, slot: impl Into<String>, query: T::Query, delay: Duration) {
        self.core.schedule_fetch_later(slot.into(), query, delay)
    }

    /// Writes an entity and waits for the server's answer.
    ///
    /// With `local_update` the value is merged into the store first.
    pub async fn put_entity(&self, id: impl Into<String>, entity: T::Entity, local_update: bool) {
        let id = id.into();
        self.core.begin_put(&id, &entity, local_update);
        self.core
            .finish_put(id, entity)
            .instrument(self.core.span("put"))
            .await
    }

    /// Saves an entity locally, flags it modified and arms reconciliation.
    pub fn put_entity_later(&self, id: impl Into<String>, entity: T::Entity) {
        self.core.put_later(id.into(), entity)
    }

    /// Creates an entity from a draft and waits for the insert and the
    /// follow-up refetch of every recorded query.
    ///
    /// `editor` defaults to the shared editor slot. With `retry`, a failed
    /// insert is resubmitted by reconciliation once its backoff elapses.
    pub async fn post_entity(&self, draft: T::Input, editor: Option<&str>, retry: bool) {
        let editor = editor.map_or_else(default_editor, str::to_string);
        let refetch = self.core.begin_post(&editor);
        self.core
            .finish_post(draft, editor, retry, refetch)
            .instrument(self.core.span("post"))
            .await
    }

    /// Fetches the ids that are not yet in the store, if any.
    pub async fn load_missing<S>(&self, ids: impl IntoIterator<Item = S>)
    where
        S: Into<Option<String>>,
    {
        self.core
            .load_missing(normalize_ids(ids))
            .instrument(self.core.span("load_missing"))
            .await
    }

    /// Arms the reconciliation loop.
    pub fn start_sync(&self) -> EngineResult<()> {
        self.core.signal_sync()
    }

    /// Applies a raw state mutation, bypassing every process.
    pub fn apply(&self, mutation: Mutation<T::Entity, T::Input, T::Query>) {
        debug!(kind = %self.core.kind.name(), mutation = mutation.name(), "direct mutation");
        self.core.store.apply(mutation);
    }

    /// Sets one selection flag of a query slot.
    pub fn set_selected(&self, slot: impl Into<String>, id: impl Into<String>, selected: bool) {
        self.core.store.apply(Mutation::SetSelected {
            slot: slot.into(),
            id: id.into(),
            selected,
        });
    }

    /// Clears the selection of a query slot.
    pub fn clear_selected(&self, slot: impl Into<String>) {
        self.core
            .store
            .apply(Mutation::ClearSelected { slot: slot.into() });
    }

    /// Replaces the draft buffer of an editor slot.
    pub fn set_entity_in(&self, editor: Option<String>, draft: T::Input) {
        self.core.store.apply(Mutation::SetEntityIn {
            editor: editor.unwrap_or_else(default_editor),
            draft,
        });
    }

    /// Replaces the whole state, bypassing merge semantics.
    pub fn hydrate(&self, state: EngineState<T>) {
        debug!(kind = %self.core.kind.name(), "hydrating state");
        self.core.store.hydrate(state);
    }

    /// Joined results of a query slot.
    pub fn query_results(&self, slot: &str) -> Option<QueryResults<T::Entity, T::Query>> {
        self.core.store.read().query_results(slot)
    }

    /// A single entity.
    pub fn entity(&self, id: &str) -> Option<T::Entity> {
        self.core.store.read().entity(id).cloned()
    }

    /// Status of an entity, not busy when none was recorded.
    pub fn entity_status(&self, id: &str) -> EntityStatus {
        self.core.store.read().entity_status(id)
    }

    /// Stops the reconciliation loop and any pending delayed fetch.
    ///
    /// Writes and posts already in flight still complete and record their
    /// outcome.
    pub fn shutdown(&self) {
        self.core.shutdown();
        if let Some(reconciler) = self.reconciler.lock().take() {
            reconciler.abort();
            debug!(kind = %self.core.kind.name(), "sync engine shut down");
        }
    }

    /// Returns true once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.core.shut_down.load(Ordering::SeqCst)
    }
}

impl<T> SyncEngine<T>
where
    T: CrudTransport,
    T::Entity: Serialize + DeserializeOwned,
    T::Input: Serialize + DeserializeOwned,
    T::Query: Serialize + DeserializeOwned,
{
    /// Writes the current state to a snapshot file.
    pub fn persist(&self, path: &Path) -> EngineResult<()> {
        let state = self.core.store.snapshot();
        save_snapshot(path, &state)?;
        debug!(kind = %self.core.kind.name(), path = %path.display(), "state persisted");
        Ok(())
    }

    /// Replaces the whole state with a snapshot file's content.
    ///
    /// Restored modified entities and pending retries are only pushed once
    /// reconciliation is armed, e.g. with [`start_sync`](Self::start_sync).
    pub fn restore(&self, path: &Path) -> EngineResult<()> {
        let state = load_snapshot(path)?;
        self.hydrate(state);
        Ok(())
    }
}

impl<T: CrudTransport> Drop for SyncEngine<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn default_editor() -> String {
    DEFAULT_EDITOR.to_string()
}
