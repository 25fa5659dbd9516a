use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Insert hit an existing record.
    #[error("match `{code}` already exists")]
    Duplicate { code: String },
    /// A persisted record does not describe a valid match.
    #[error("stored match `{code}` is corrupted: {reason}")]
    Corrupted { code: String, reason: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a corruption error for the record stored under `code`.
    pub fn corrupted(code: impl Into<String>, reason: impl Into<String>) -> Self {
        StorageError::Corrupted {
            code: code.into(),
            reason: reason.into(),
        }
    }
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The stored version matched and the record was replaced.
    Written,
    /// Another writer got there first (or the record vanished).
    Conflict,
}
