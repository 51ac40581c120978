use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    AggregateId, AggregateRecord, EventEnvelope, Result, StoreError, Version,
    store::{AggregateStore, SaveOptions, validate_batch},
};

#[derive(Default)]
struct Inner {
    records: HashMap<AggregateId, AggregateRecord>,
    outbox: Vec<EventEnvelope>,
}

/// In-memory aggregate store for tests and local runs.
///
/// Records and the outbox share one lock, so a save is atomic.
#[derive(Clone, Default)]
pub struct InMemoryAggregateStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryAggregateStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored aggregates.
    pub async fn record_count(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Returns the total number of outbox events.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.outbox.len()
    }

    /// Returns every outbox event in insertion order.
    pub async fn all_events(&self) -> Vec<EventEnvelope> {
        self.inner.read().await.outbox.clone()
    }

    /// Clears all records and events.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.records.clear();
        inner.outbox.clear();
    }
}

#[async_trait]
impl AggregateStore for InMemoryAggregateStore {
    async fn load(&self, aggregate_id: AggregateId) -> Result<Option<AggregateRecord>> {
        Ok(self.inner.read().await.records.get(&aggregate_id).cloned())
    }

    async fn save(
        &self,
        mut record: AggregateRecord,
        events: Vec<EventEnvelope>,
        options: SaveOptions,
    ) -> Result<Version> {
        validate_batch(&record, &events)?;

        let aggregate_id = record.aggregate_id;
        let mut inner = self.inner.write().await;

        let current_version = match inner.records.get(&aggregate_id) {
            Some(existing) if existing.aggregate_type != record.aggregate_type => {
                return Err(StoreError::AggregateTypeMismatch {
                    aggregate_id,
                    stored: existing.aggregate_type.clone(),
                    requested: record.aggregate_type,
                });
            }
            Some(existing) => existing.version,
            None => Version::initial(),
        };

        if current_version != options.expected_version {
            return Err(StoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version,
                actual: current_version,
            });
        }

        let new_version = current_version.next();
        record.version = new_version;
        record.saved_at = Utc::now();

        let event_count = events.len();
        inner.outbox.extend(
            events
                .into_iter()
                .zip(0u32..)
                .map(|(event, sequence)| event.at(new_version, sequence)),
        );
        inner.records.insert(aggregate_id, record);

        tracing::debug!(%aggregate_id, version = %new_version, event_count, "aggregate saved");

        Ok(new_version)
    }

    async fn events_for_aggregate(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner
            .outbox
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect())
    }

    async fn events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner
            .outbox
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect())
    }
}
