//! # crudsync Store
//!
//! Normalized client-side state for the crudsync engine.
//!
//! This crate provides:
//! - `CrudState` holding entities, per-entity status, queries, results,
//!   selections, editor drafts and post status for one entity kind
//! - `Mutation` as the only way to change a `CrudState`
//! - Selectors (pure read projections, including the joined `QueryResults`)
//! - `SharedStore` for sharing one state between concurrent processes
//! - JSON snapshots for persisting and restoring state
//!
//! This crate performs no network I/O.
//!
//! ## Key Invariants
//!
//! - Setting entities merges by id and never removes unrelated ids
//! - Status patches merge only the fields they carry
//! - Starting a new post for an editor slot replaces that slot's status entirely
//! - Hydration replaces the whole state, bypassing merge semantics

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod error;
mod mutation;
mod selectors;
mod shared;
mod snapshot;
mod state;
mod status;

pub use error::{StoreError, StoreResult};
pub use mutation::Mutation;
pub use selectors::{EntityWithStatus, QueryResults};
pub use shared::SharedStore;
pub use snapshot::{load_snapshot, save_snapshot};
pub use state::CrudState;
pub use status::{EntityStatus, EntityStatusPatch, PostStatus, QueryResult, DEFAULT_EDITOR};
