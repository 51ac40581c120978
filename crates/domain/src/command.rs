//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use serde_json::json;
use store::{AggregateRecord, AggregateStore, EventEnvelope, SaveOptions, StoreError, Version};
use uuid::Uuid;

use crate::aggregate::{AggregateRoot, DomainEvent};
use crate::config::CommerceConfig;
use crate::error::{DomainResult, ServiceError};

/// Envelope metadata key shared by all events persisted in one save.
pub const CORRELATION_ID_KEY: &str = "correlation_id";

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: AggregateRoot> {
    /// The aggregate after the command, with its events committed.
    pub aggregate: A,

    /// The events that were recorded and persisted.
    pub events: Vec<A::Event>,

    /// The new version of the aggregate after the command.
    pub new_version: Version,
}

/// Handler for running commands against aggregates.
///
/// Each command is one load-mutate-save cycle:
/// 1. Load the aggregate snapshot and its version
/// 2. Run the command against the aggregate
/// 3. Save the new snapshot and its uncommitted events, expecting the
///    loaded version
/// 4. Mark the events as committed
///
/// If the save loses an optimistic concurrency race the whole cycle is
/// repeated, up to `max_retries` times.
pub struct CommandHandler<S, A>
where
    S: AggregateStore,
    A: AggregateRoot,
{
    store: S,
    max_retries: u32,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: AggregateStore,
    A: AggregateRoot,
{
    /// Creates a new command handler with default settings.
    pub fn new(store: S) -> Self {
        Self::with_config(store, &CommerceConfig::default())
    }

    pub fn with_config(store: S, config: &CommerceConfig) -> Self {
        Self {
            store,
            max_retries: config.max_conflict_retries,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Saves a freshly created aggregate.
    ///
    /// Fails with a concurrency conflict if the id is already taken.
    #[tracing::instrument(skip(self, aggregate), fields(aggregate_type = A::aggregate_type()))]
    pub async fn create(&self, aggregate: A) -> Result<CommandResult<A>, ServiceError> {
        metrics::counter!("commerce_commands_total", "aggregate" => A::aggregate_type())
            .increment(1);
        self.commit(aggregate, Version::initial()).await
    }

    /// Loads an aggregate, failing with `AggregateNotFound` if it was never saved.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, ServiceError> {
        let (aggregate, _) = self.load_versioned(aggregate_id).await?;
        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn find(&self, aggregate_id: AggregateId) -> Result<Option<A>, ServiceError> {
        match self.load_versioned(aggregate_id).await {
            Ok((aggregate, _)) => Ok(Some(aggregate)),
            Err(ServiceError::AggregateNotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Runs a command and persists the result.
    ///
    /// The command may run more than once if a concurrent writer saved the
    /// aggregate in between, so it must only touch the aggregate it is given.
    #[tracing::instrument(skip(self, command), fields(aggregate_type = A::aggregate_type()))]
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        mut command: F,
    ) -> Result<CommandResult<A>, ServiceError>
    where
        F: FnMut(&mut A) -> DomainResult<()>,
    {
        metrics::counter!("commerce_commands_total", "aggregate" => A::aggregate_type())
            .increment(1);

        let mut attempt = 0;
        loop {
            let (mut aggregate, version) = self.load_versioned(aggregate_id).await?;
            command(&mut aggregate)?;

            match self.commit(aggregate, version).await {
                Err(err) if err.is_conflict() && attempt < self.max_retries => {
                    attempt += 1;
                    metrics::counter!(
                        "commerce_command_conflicts_total",
                        "aggregate" => A::aggregate_type()
                    )
                    .increment(1);
                    tracing::warn!(%aggregate_id, attempt, "concurrency conflict, retrying command");
                }
                result => return result,
            }
        }
    }

    async fn load_versioned(&self, aggregate_id: AggregateId) -> Result<(A, Version), ServiceError> {
        let record = self.store.load(aggregate_id).await?.ok_or_else(|| {
            ServiceError::AggregateNotFound {
                aggregate_type: A::aggregate_type(),
                aggregate_id: aggregate_id.to_string(),
            }
        })?;

        if record.aggregate_type != A::aggregate_type() {
            return Err(StoreError::AggregateTypeMismatch {
                aggregate_id,
                stored: record.aggregate_type,
                requested: A::aggregate_type().to_string(),
            }
            .into());
        }

        let aggregate: A = record.to_state()?;
        Ok((aggregate, record.version))
    }

    async fn commit(
        &self,
        mut aggregate: A,
        expected_version: Version,
    ) -> Result<CommandResult<A>, ServiceError> {
        let aggregate_id = aggregate.aggregate_id();
        let events = aggregate.uncommitted_events();
        let envelopes = self.build_envelopes(aggregate_id, &events)?;
        let record = AggregateRecord::from_state(aggregate_id, A::aggregate_type(), &aggregate)?;

        let new_version = self
            .store
            .save(record, envelopes, SaveOptions::expect_version(expected_version))
            .await?;
        aggregate.mark_events_as_committed();

        metrics::counter!("commerce_events_recorded_total", "aggregate" => A::aggregate_type())
            .increment(events.len() as u64);
        tracing::debug!(
            %aggregate_id,
            version = %new_version,
            event_count = events.len(),
            "aggregate committed"
        );

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    /// Builds outbox envelopes from domain events.
    ///
    /// Every envelope of one save carries the same `correlation_id` metadata
    /// entry, so consumers can group the events a single command produced.
    fn build_envelopes(
        &self,
        aggregate_id: AggregateId,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, ServiceError> {
        let correlation_id = Uuid::new_v4().to_string();
        events
            .iter()
            .map(|event| {
                EventEnvelope::wrap(
                    aggregate_id,
                    A::aggregate_type(),
                    event.event_type(),
                    event.occurred_at(),
                    event,
                )
                .map(|envelope| {
                    envelope.with_metadata(CORRELATION_ID_KEY, json!(correlation_id))
                })
                .map_err(ServiceError::from)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use store::{InMemoryAggregateStore, Result as StoreResult};

    use super::*;
    use crate::aggregate::EventLog;
    use crate::error::DomainError;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum CounterEvent {
        Incremented { by: u32, at: DateTime<Utc> },
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            "CounterIncremented"
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            match self {
                CounterEvent::Incremented { at, .. } => *at,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Counter {
        id: AggregateId,
        value: u32,
        #[serde(skip)]
        events: EventLog<CounterEvent>,
    }

    impl Counter {
        fn new() -> Self {
            Self {
                id: AggregateId::new(),
                value: 0,
                events: EventLog::new(),
            }
        }

        fn increment(&mut self, by: u32) -> DomainResult<()> {
            if by == 0 {
                return Err(DomainError::validation("by", "must be positive"));
            }
            self.value += by;
            self.events.record(CounterEvent::Incremented { by, at: Utc::now() });
            Ok(())
        }
    }

    impl AggregateRoot for Counter {
        type Event = CounterEvent;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn aggregate_id(&self) -> AggregateId {
            self.id
        }

        fn uncommitted_events(&self) -> Vec<CounterEvent> {
            self.events.events().to_vec()
        }

        fn mark_events_as_committed(&mut self) {
            self.events.clear();
        }
    }

    /// Store that reports a conflict for the first `failures` saves.
    struct ContendedStore {
        inner: InMemoryAggregateStore,
        failures: AtomicU32,
        attempts: Arc<AtomicU32>,
    }

    impl ContendedStore {
        fn new(inner: InMemoryAggregateStore, failures: u32) -> Self {
            Self {
                inner,
                failures: AtomicU32::new(failures),
                attempts: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    #[async_trait]
    impl AggregateStore for ContendedStore {
        async fn load(&self, aggregate_id: AggregateId) -> StoreResult<Option<AggregateRecord>> {
            self.inner.load(aggregate_id).await
        }

        async fn save(
            &self,
            record: AggregateRecord,
            events: Vec<EventEnvelope>,
            options: SaveOptions,
        ) -> StoreResult<Version> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::ConcurrencyConflict {
                    aggregate_id: record.aggregate_id,
                    expected: options.expected_version,
                    actual: options.expected_version.next(),
                });
            }
            self.inner.save(record, events, options).await
        }

        async fn events_for_aggregate(
            &self,
            aggregate_id: AggregateId,
        ) -> StoreResult<Vec<EventEnvelope>> {
            self.inner.events_for_aggregate(aggregate_id).await
        }

        async fn events_by_type(&self, event_type: &str) -> StoreResult<Vec<EventEnvelope>> {
            self.inner.events_by_type(event_type).await
        }
    }

    async fn created_counter(store: &InMemoryAggregateStore) -> AggregateId {
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());
        let mut counter = Counter::new();
        counter.increment(1).unwrap();
        handler.create(counter).await.unwrap().aggregate.id
    }

    #[tokio::test]
    async fn test_create_persists_record_and_events() {
        let store = InMemoryAggregateStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());

        let mut counter = Counter::new();
        counter.increment(2).unwrap();
        let result = handler.create(counter).await.unwrap();

        assert_eq!(result.new_version, Version::first());
        assert_eq!(result.events.len(), 1);
        assert!(!result.aggregate.has_uncommitted_events());
        assert_eq!(store.record_count().await, 1);
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let store = InMemoryAggregateStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store);

        let counter = Counter::new();
        handler.create(counter.clone()).await.unwrap();
        let err = handler.create(counter).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_events_of_one_save_share_correlation_id() {
        let store = InMemoryAggregateStore::new();
        let id = created_counter(&store).await;
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());

        handler
            .execute(id, |counter| {
                counter.increment(1)?;
                counter.increment(2)
            })
            .await
            .unwrap();

        let events = store.events_for_aggregate(id).await.unwrap();
        assert_eq!(events.len(), 3);
        let correlation = |envelope: &EventEnvelope| {
            envelope.metadata[CORRELATION_ID_KEY]
                .as_str()
                .unwrap()
                .parse::<Uuid>()
                .unwrap()
        };
        assert_eq!(correlation(&events[1]), correlation(&events[2]));
        assert_ne!(correlation(&events[0]), correlation(&events[1]));
    }

    #[tokio::test]
    async fn test_execute_updates_aggregate() {
        let store = InMemoryAggregateStore::new();
        let id = created_counter(&store).await;
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());

        let result = handler
            .execute(id, |counter| counter.increment(41))
            .await
            .unwrap();

        assert_eq!(result.aggregate.value, 42);
        assert_eq!(result.new_version, Version::new(2));

        let events = store.events_for_aggregate(id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].version, Version::new(2));
        let decoded: CounterEvent = events[1].decode().unwrap();
        assert!(matches!(decoded, CounterEvent::Incremented { by: 41, .. }));
    }

    #[tokio::test]
    async fn test_execute_domain_error_saves_nothing() {
        let store = InMemoryAggregateStore::new();
        let id = created_counter(&store).await;
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());

        let err = handler
            .execute(id, |counter| counter.increment(0))
            .await
            .unwrap_err();

        assert!(err.as_domain().is_some_and(DomainError::is_validation));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn test_load_and_find_missing() {
        let handler: CommandHandler<_, Counter> = CommandHandler::new(InMemoryAggregateStore::new());
        let id = AggregateId::new();

        assert!(handler.find(id).await.unwrap().is_none());
        assert!(matches!(
            handler.load(id).await.unwrap_err(),
            ServiceError::AggregateNotFound {
                aggregate_type: "Counter",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_conflict_is_retried() {
        let inner = InMemoryAggregateStore::new();
        let id = created_counter(&inner).await;
        let store = ContendedStore::new(inner.clone(), 2);
        let attempts = store.attempts.clone();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store);

        let mut runs = 0;
        let result = handler
            .execute(id, |counter| {
                runs += 1;
                counter.increment(1)
            })
            .await
            .unwrap();

        assert_eq!(runs, 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(result.aggregate.value, 2);
        assert_eq!(inner.event_count().await, 2);
    }

    #[tokio::test]
    async fn test_conflict_gives_up_after_max_retries() {
        let inner = InMemoryAggregateStore::new();
        let id = created_counter(&inner).await;
        let config = CommerceConfig {
            max_conflict_retries: 1,
            ..CommerceConfig::default()
        };
        let handler: CommandHandler<_, Counter> =
            CommandHandler::with_config(ContendedStore::new(inner, 5), &config);

        let err = handler
            .execute(id, |counter| counter.increment(1))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
