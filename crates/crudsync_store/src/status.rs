//! Status records kept alongside entities, queries and editors.

use serde::{Deserialize, Serialize};

/// Editor slot used when the caller does not name one.
pub const DEFAULT_EDITOR: &str = "";

/// Synchronization status of a single entity.
///
/// `modified` means a local edit has not been confirmed durable yet. It is
/// cleared only when a write is confirmed by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStatus {
    /// A write for this entity is in flight.
    pub busy: bool,
    /// Local value differs from the last confirmed server value.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub modified: bool,
    /// Message of the last failed write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Status code of the last failed write, if the transport reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl EntityStatus {
    /// Creates a status with only the busy flag set as given.
    pub fn new(busy: bool) -> Self {
        Self {
            busy,
            ..Self::default()
        }
    }

    /// Returns a copy with the fields present in `patch` replaced.
    pub fn merged(&self, patch: &EntityStatusPatch) -> Self {
        Self {
            busy: patch.busy.unwrap_or(self.busy),
            modified: patch.modified.unwrap_or(self.modified),
            error: patch.error.clone().unwrap_or_else(|| self.error.clone()),
            status: patch.status.unwrap_or(self.status),
        }
    }
}

/// A partial update of an [`EntityStatus`].
///
/// Fields left as `None` keep their current value. `error` and `status` use a
/// nested option so a patch can explicitly clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStatusPatch {
    /// New busy flag.
    pub busy: Option<bool>,
    /// New modified flag.
    pub modified: Option<bool>,
    /// New error message (`Some(None)` clears it).
    pub error: Option<Option<String>>,
    /// New status code (`Some(None)` clears it).
    pub status: Option<Option<u16>>,
}

impl EntityStatusPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the busy flag.
    pub fn busy(mut self, busy: bool) -> Self {
        self.busy = Some(busy);
        self
    }

    /// Sets the modified flag.
    pub fn modified(mut self, modified: bool) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Sets (or clears) the error message.
    pub fn error(mut self, error: Option<String>) -> Self {
        self.error = Some(error);
        self
    }

    /// Sets (or clears) the status code.
    pub fn status(mut self, status: Option<u16>) -> Self {
        self.status = Some(status);
        self
    }

    /// Patch applied when a write was confirmed: not busy, not modified, no error.
    pub fn confirmed() -> Self {
        Self::new()
            .busy(false)
            .modified(false)
            .error(None)
            .status(None)
    }

    /// Patch applied when a write failed. `modified` is left untouched.
    pub fn failed(error: impl Into<String>, status: Option<u16>) -> Self {
        Self::new()
            .busy(false)
            .error(Some(error.into()))
            .status(status)
    }
}

/// Lifecycle of one create attempt for an editor slot.
///
/// `retry_at` (milliseconds since the Unix epoch) is only set when the caller
/// opted into retry. Together with a stored `draft` and `busy == false` it is
/// what makes the slot eligible for automatic resubmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "O: Serialize, I: Serialize",
    deserialize = "O: Deserialize<'de>, I: Deserialize<'de>"
))]
pub struct PostStatus<O, I> {
    /// An insert is in flight.
    pub busy: bool,
    /// Entity created by the last successful insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<O>,
    /// Message of the last failed insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Status code of the last failed insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Earliest time (epoch millis) at which the draft may be resubmitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_at: Option<u64>,
    /// Draft input of the failed insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<I>,
}

impl<O, I> Default for PostStatus<O, I> {
    fn default() -> Self {
        Self {
            busy: false,
            entity: None,
            error: None,
            status: None,
            retry_at: None,
            draft: None,
        }
    }
}

impl<O, I> PostStatus<O, I> {
    /// Status of a post that has just been submitted.
    pub fn pending() -> Self {
        Self {
            busy: true,
            ..Self::default()
        }
    }

    /// Status of a post whose insert returned `entity`.
    pub fn succeeded(entity: O) -> Self {
        Self {
            entity: Some(entity),
            ..Self::default()
        }
    }

    /// Status of a post whose insert failed.
    pub fn failed(
        error: impl Into<String>,
        status: Option<u16>,
        draft: I,
        retry_at: Option<u64>,
    ) -> Self {
        Self {
            busy: false,
            entity: None,
            error: Some(error.into()),
            status,
            retry_at,
            draft: Some(draft),
        }
    }

    /// Returns true if this slot carries a draft scheduled for resubmission.
    pub fn has_pending_retry(&self) -> bool {
        self.retry_at.is_some() && self.draft.is_some()
    }

    /// Returns true if the draft should be resubmitted at time `now`.
    pub fn is_retry_due(&self, now: u64) -> bool {
        match self.retry_at {
            Some(retry_at) => self.draft.is_some() && !self.busy && now >= retry_at,
            None => false,
        }
    }
}

/// Result list of one query slot.
///
/// The order of `ids` is the authoritative result order. Ids may reference
/// entities not yet present in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Ordered entity ids.
    pub ids: Vec<String>,
    /// A fetch for this slot is in flight.
    pub loading: bool,
    /// Message of the last failed fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Status code of the last failed fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl QueryResult {
    /// A settled result with the given ids.
    pub fn loaded(ids: Vec<String>) -> Self {
        Self {
            ids,
            ..Self::default()
        }
    }

    /// `previous` (or an empty result) with the loading flag raised.
    ///
    /// Ids and errors of the previous result are kept while the fetch runs.
    pub fn loading_from(previous: Option<&QueryResult>) -> Self {
        Self {
            loading: true,
            ..previous.cloned().unwrap_or_default()
        }
    }

    /// `previous` (or an empty result) settled with a fetch failure.
    ///
    /// Stale ids are kept so consumers can keep rendering them.
    pub fn failed_from(
        previous: Option<&QueryResult>,
        error: impl Into<String>,
        status: Option<u16>,
    ) -> Self {
        Self {
            loading: false,
            error: Some(error.into()),
            status,
            ..previous.cloned().unwrap_or_default()
        }
    }
}
