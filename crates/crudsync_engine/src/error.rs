//! Error types for the sync engine.

use crudsync_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// A rejected transport call.
///
/// This is the only failure the sync processes recognise. It is never
/// returned to callers of the processes; it is recorded in the `error` and
/// `status` fields of the affected entity, query or editor slot instead.
/// Status codes are passed through without interpretation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    /// Human readable failure message.
    pub message: String,
    /// Numeric status code, if the transport has one.
    pub status: Option<u16>,
}

impl TransportError {
    /// Creates an error without a status code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Creates an error carrying a status code.
    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

/// Errors surfaced by the engine itself.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The reconciliation loop is no longer running.
    #[error("sync engine has been shut down")]
    Shutdown,

    /// Persisting or restoring state failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display() {
        let err = TransportError::with_status("not found", 404);
        assert_eq!(err.to_string(), "not found");
        assert_eq!(err.status, Some(404));

        let err = TransportError::new("connection reset");
        assert_eq!(err.status, None);
    }

    #[test]
    fn engine_error_display() {
        assert_eq!(
            EngineError::Shutdown.to_string(),
            "sync engine has been shut down"
        );

        let err: EngineError = StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ))
        .into();
        assert!(err.to_string().starts_with("store error"));
    }
}
