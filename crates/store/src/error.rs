use thiserror::Error;

use crate::{AggregateId, Version};

/// Errors that can occur when interacting with the aggregate store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored version did not match the version the writer loaded.
    #[error(
        "Concurrency conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// A record was saved under an id already owned by another aggregate type.
    #[error("Aggregate {aggregate_id} is a {stored}, not a {requested}")]
    AggregateTypeMismatch {
        aggregate_id: AggregateId,
        stored: String,
        requested: String,
    },

    /// The outbox batch does not belong to the record being saved.
    #[error("Invalid event batch: {0}")]
    InvalidBatch(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if the error is an optimistic concurrency failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
