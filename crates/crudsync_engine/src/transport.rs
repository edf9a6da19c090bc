//! Transport layer abstraction for list, insert and update calls.

use crate::error::TransportError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Result of a transport call.
pub type TransportResult<T> = Result<T, TransportError>;

/// Performs calls against the remote API for one entity kind.
///
/// Implementations own wire formats, authentication, pagination and
/// validation. Every call may fail; failures are reported as
/// [`TransportError`] and never interpreted by the engine.
#[async_trait]
pub trait CrudTransport: Send + Sync + 'static {
    /// Confirmed entity type.
    type Entity: Clone + Send + Sync + 'static;
    /// Draft input type accepted by `insert`.
    type Input: Clone + Send + Sync + 'static;
    /// Query parameter type accepted by `list`.
    type Query: Clone + Send + Sync + 'static;

    /// Lists the entities matching `query`, in result order.
    async fn list(&self, query: &Self::Query) -> TransportResult<Vec<Self::Entity>>;

    /// Creates an entity from a draft.
    async fn insert(&self, input: &Self::Input) -> TransportResult<Self::Entity>;

    /// Overwrites the entity with id `id`.
    async fn update(&self, id: &str, entity: &Self::Entity) -> TransportResult<Self::Entity>;
}

struct Script<T> {
    queued: VecDeque<TransportResult<T>>,
    fallback: Option<TransportResult<T>>,
}

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self {
            queued: VecDeque::new(),
            fallback: None,
        }
    }

    fn next(&mut self) -> Option<TransportResult<T>> {
        self.queued.pop_front().or_else(|| self.fallback.clone())
    }
}

/// A scripted transport for testing.
///
/// Each operation answers from a queue of scripted results first, then from
/// its fallback result. `update` echoes the entity back when nothing is
/// scripted. Every call is recorded.
pub struct MockTransport<O, I, Q> {
    latency: Duration,
    list: Mutex<Script<Vec<O>>>,
    insert: Mutex<Script<O>>,
    update: Mutex<Script<O>>,
    list_calls: Mutex<Vec<Q>>,
    insert_calls: Mutex<Vec<I>>,
    update_calls: Mutex<Vec<(String, O)>>,
}

impl<O: Clone, I: Clone, Q: Clone> MockTransport<O, I, Q> {
    /// Creates a mock that answers immediately.
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            list: Mutex::new(Script::new()),
            insert: Mutex::new(Script::new()),
            update: Mutex::new(Script::new()),
            list_calls: Mutex::new(Vec::new()),
            insert_calls: Mutex::new(Vec::new()),
            update_calls: Mutex::new(Vec::new()),
        }
    }

    /// Delays every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queues the answer of the next unanswered `list` call.
    pub fn push_list(&self, result: TransportResult<Vec<O>>) {
        self.list.lock().queued.push_back(result);
    }

    /// Sets the answer of `list` calls once the queue is empty.
    pub fn set_list(&self, result: TransportResult<Vec<O>>) {
        self.list.lock().fallback = Some(result);
    }

    /// Queues the answer of the next unanswered `insert` call.
    pub fn push_insert(&self, result: TransportResult<O>) {
        self.insert.lock().queued.push_back(result);
    }

    /// Sets the answer of `insert` calls once the queue is empty.
    pub fn set_insert(&self, result: TransportResult<O>) {
        self.insert.lock().fallback = Some(result);
    }

    /// Queues the answer of the next unanswered `update` call.
    pub fn push_update(&self, result: TransportResult<O>) {
        self.update.lock().queued.push_back(result);
    }

    /// Sets the answer of `update` calls once the queue is empty.
    pub fn set_update(&self, result: TransportResult<O>) {
        self.update.lock().fallback = Some(result);
    }

    /// Queries passed to `list`, in call order.
    pub fn list_calls(&self) -> Vec<Q> {
        self.list_calls.lock().clone()
    }

    /// Drafts passed to `insert`, in call order.
    pub fn insert_calls(&self) -> Vec<I> {
        self.insert_calls.lock().clone()
    }

    /// Ids and entities passed to `update`, in call order.
    pub fn update_calls(&self) -> Vec<(String, O)> {
        self.update_calls.lock().clone()
    }

    async fn wait(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl<O: Clone, I: Clone, Q: Clone> Default for MockTransport<O, I, Q> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<O, I, Q> CrudTransport for MockTransport<O, I, Q>
where
    O: Clone + Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
    Q: Clone + Send + Sync + 'static,
{
    type Entity = O;
    type Input = I;
    type Query = Q;

    async fn list(&self, query: &Q) -> TransportResult<Vec<O>> {
        self.list_calls.lock().push(query.clone());
        self.wait().await;
        let next = self.list.lock().next();
        next.unwrap_or_else(|| Err(TransportError::new("no mock list response set")))
    }

    async fn insert(&self, input: &I) -> TransportResult<O> {
        self.insert_calls.lock().push(input.clone());
        self.wait().await;
        let next = self.insert.lock().next();
        next.unwrap_or_else(|| Err(TransportError::new("no mock insert response set")))
    }

    async fn update(&self, id: &str, entity: &O) -> TransportResult<O> {
        self.update_calls
            .lock()
            .push((id.to_string(), entity.clone()));
        self.wait().await;
        let next = self.update.lock().next();
        next.unwrap_or_else(|| Ok(entity.clone()))
    }
}
