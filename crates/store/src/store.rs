use async_trait::async_trait;

use crate::{AggregateId, AggregateRecord, EventEnvelope, Result, StoreError, Version};

/// Options for saving an aggregate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Version the writer loaded. The save fails with `ConcurrencyConflict`
    /// if the stored version differs.
    pub expected_version: Version,
}

impl SaveOptions {
    /// Expects the aggregate to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: version,
        }
    }

    /// Expects the aggregate to not exist yet.
    pub fn expect_new() -> Self {
        Self::expect_version(Version::initial())
    }
}

/// Storage for aggregate state plus its event outbox.
///
/// Implementations must make `save` atomic: the record and all of its events
/// are written together or not at all.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Loads the current record for an aggregate.
    ///
    /// Returns None if the aggregate was never saved.
    async fn load(&self, aggregate_id: AggregateId) -> Result<Option<AggregateRecord>>;

    /// Saves a record and appends its events to the outbox.
    ///
    /// Returns the new version of the record.
    async fn save(
        &self,
        record: AggregateRecord,
        events: Vec<EventEnvelope>,
        options: SaveOptions,
    ) -> Result<Version>;

    /// Retrieves all outbox events for one aggregate, oldest first.
    async fn events_for_aggregate(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>>;

    /// Retrieves all outbox events of one type, oldest first.
    async fn events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>>;
}

/// Extension trait providing convenience methods for aggregate stores.
#[async_trait]
pub trait AggregateStoreExt: AggregateStore {
    /// Checks if an aggregate has been saved.
    async fn exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.load(aggregate_id).await?.is_some())
    }

    /// Returns the current version of an aggregate, or `Version::initial()`
    /// if it was never saved.
    async fn current_version(&self, aggregate_id: AggregateId) -> Result<Version> {
        Ok(self
            .load(aggregate_id)
            .await?
            .map(|record| record.version)
            .unwrap_or_default())
    }
}

impl<T: AggregateStore + ?Sized> AggregateStoreExt for T {}

/// Checks that every envelope in a batch belongs to the record being saved.
pub fn validate_batch(record: &AggregateRecord, events: &[EventEnvelope]) -> Result<()> {
    for event in events {
        if event.aggregate_id != record.aggregate_id {
            return Err(StoreError::InvalidBatch(format!(
                "event {} belongs to aggregate {}, not {}",
                event.event_id, event.aggregate_id, record.aggregate_id
            )));
        }
        if event.aggregate_type != record.aggregate_type {
            return Err(StoreError::InvalidBatch(format!(
                "event {} has aggregate type {}, expected {}",
                event.event_id, event.aggregate_type, record.aggregate_type
            )));
        }
    }
    Ok(())
}
