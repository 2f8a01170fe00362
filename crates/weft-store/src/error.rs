//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the persistence layer.
///
/// Store failures are the engine-fatal error class: when a write fails the
/// run cannot safely continue, so the orchestrator surfaces these rather
/// than retrying.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (canvas, execution, node state, checkpoint).
        entity: &'static str,
        /// Identifier that missed.
        id: String,
    },

    /// The record fails the state validity predicate.
    #[error("record rejected: {0}")]
    InvalidRecord(String),

    /// An attempt was made to mutate a finished record.
    #[error("record for {id} is finished and immutable")]
    FinishedRecordImmutable {
        /// Identifier of the terminal record.
        id: String,
    },

    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Serialization of a stored document failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Convenience constructor for `NotFound`.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
