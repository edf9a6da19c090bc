//! # crudsync Engine
//!
//! Synchronization engine keeping a normalized client-side store consistent
//! with a backend.
//!
//! This crate provides:
//! - Query fetches, immediate and delayed (newest-wins)
//! - Optimistic writes confirmed asynchronously
//! - Deferred writes ("save locally now, sync eventually")
//! - Creates from drafts with opt-in automatic retry
//! - Missing-ids loading
//! - A debounced, level-triggered reconciliation loop
//! - A transport abstraction and a scripted mock transport
//!
//! ## Architecture
//!
//! Consumers declare an entity kind once ([`EntityKind`]: identity and
//! ids-to-query functions) and supply a [`CrudTransport`]. Intents become
//! store mutations and transport calls; views read the store through the
//! selectors of `crudsync_store`.
//!
//! ## Key Invariants
//!
//! - Transport failures are recorded in status fields, never returned
//! - `modified` is cleared only by a confirmed write
//! - A pending post retry is the only other reconciliation trigger
//! - Start signals coalesce; only one reconciliation loop runs per engine
//! - Concurrent writes to one id are last-response-wins; no conflict detection

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod clock;
mod config;
mod engine;
mod error;
mod fetch;
mod intent;
mod kind;
mod post;
mod reconcile;
#[cfg(test)]
mod testing;
mod transport;
mod write;

pub use clock::{Clock, RuntimeClock};
pub use config::EngineConfig;
pub use engine::{
    EngineBuilder, EngineIntent, EngineState, EngineStats, EngineStore, SyncEngine,
};
pub use error::{EngineError, EngineResult, TransportError};
pub use intent::Intent;
pub use kind::EntityKind;
pub use transport::{CrudTransport, MockTransport, TransportResult};

pub use crudsync_store::{
    CrudState, EntityStatus, EntityStatusPatch, EntityWithStatus, Mutation, PostStatus,
    QueryResult, QueryResults, SharedStore, DEFAULT_EDITOR,
};
