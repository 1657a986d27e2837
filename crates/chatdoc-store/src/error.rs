//! Store error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("storage quota exceeded writing '{key}': {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Why an import was refused. The persisted collection is untouched in every case.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("import has no 'entries' array")]
    MissingEntries,

    #[error("entry {index} is malformed: {source}")]
    InvalidEntry {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate entry id: {0}")]
    DuplicateId(String),

    #[error("imported history could not be persisted: {0}")]
    Persist(#[source] StoreError),
}

/// Result of a mutating store operation.
///
/// Persistence failures are recovered locally, so callers get this signal
/// instead of an error when a write did not stick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum WriteOutcome {
    /// The new state was persisted.
    Written,
    /// Nothing to do (unknown id, rejected insert); no write was attempted.
    Unchanged,
    /// The write failed and the previously persisted state is still in place.
    NotDurable,
}

impl WriteOutcome {
    pub fn is_durable(self) -> bool {
        !matches!(self, Self::NotDurable)
    }
}
