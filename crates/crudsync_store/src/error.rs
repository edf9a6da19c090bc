//! Error types for the store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while persisting or restoring state.
///
/// Merging into a `CrudState` is infallible; only snapshot I/O can fail.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error while reading or writing a snapshot.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
