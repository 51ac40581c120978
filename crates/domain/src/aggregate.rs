//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain. They are
/// immutable snapshots, named in past tense, and never reference live
/// aggregate state.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// Used for outbox routing and filtering.
    fn event_type(&self) -> &'static str;

    /// When the event happened.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Ordered buffer of events recorded by one entity and not yet committed.
///
/// Every aggregate and every owned child entity carries one of these. It is
/// never serialized with the entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog<E> {
    events: Vec<E>,
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E: Clone> EventLog<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn record(&mut self, event: E) {
        self.events.push(event);
    }

    /// Appends events drained from another log, keeping their order.
    pub fn absorb(&mut self, events: Vec<E>) {
        self.events.extend(events);
    }

    /// Returns the recorded events, oldest first.
    pub fn events(&self) -> &[E] {
        &self.events
    }

    /// Removes and returns all recorded events.
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Trait for aggregate roots.
///
/// An aggregate root is the only entry point for mutating itself and the
/// entities it owns. It is persisted as a serialized snapshot and reports the
/// events its mutators recorded until they are committed.
pub trait AggregateRoot: Serialize + DeserializeOwned + Send + Sync {
    /// The type of events this aggregate and its children record.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    ///
    /// Used for storage organization and routing.
    fn aggregate_type() -> &'static str;

    /// Returns the storage key of this aggregate.
    fn aggregate_id(&self) -> AggregateId;

    /// Returns the aggregate's own events followed by the events of each
    /// owned child, in child order.
    fn uncommitted_events(&self) -> Vec<Self::Event>;

    /// Clears the aggregate's log and the logs of all children.
    fn mark_events_as_committed(&mut self);

    /// Returns true if any event is waiting to be committed.
    fn has_uncommitted_events(&self) -> bool {
        !self.uncommitted_events().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum TestEvent {
        Created { at: DateTime<Utc> },
        Renamed { name: String, at: DateTime<Utc> },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Created { .. } => "TestCreated",
                TestEvent::Renamed { .. } => "TestRenamed",
            }
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            match self {
                TestEvent::Created { at } | TestEvent::Renamed { at, .. } => *at,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Child {
        name: String,
        #[serde(skip)]
        events: EventLog<TestEvent>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct TestAggregate {
        id: AggregateId,
        children: Vec<Child>,
        #[serde(skip)]
        events: EventLog<TestEvent>,
    }

    impl AggregateRoot for TestAggregate {
        type Event = TestEvent;

        fn aggregate_type() -> &'static str {
            "TestAggregate"
        }

        fn aggregate_id(&self) -> AggregateId {
            self.id
        }

        fn uncommitted_events(&self) -> Vec<TestEvent> {
            let mut events = self.events.events().to_vec();
            for child in &self.children {
                events.extend_from_slice(child.events.events());
            }
            events
        }

        fn mark_events_as_committed(&mut self) {
            self.events.clear();
            for child in &mut self.children {
                child.events.clear();
            }
        }
    }

    fn aggregate() -> TestAggregate {
        let now = Utc::now();
        let mut child = Child {
            name: "child".to_string(),
            events: EventLog::new(),
        };
        child.events.record(TestEvent::Renamed {
            name: "child".to_string(),
            at: now,
        });

        let mut aggregate = TestAggregate {
            id: AggregateId::new(),
            children: vec![child],
            events: EventLog::new(),
        };
        aggregate.events.record(TestEvent::Created { at: now });
        aggregate
    }

    #[test]
    fn test_event_log_record_and_drain() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.record(TestEvent::Created { at: Utc::now() });
        log.absorb(vec![TestEvent::Renamed {
            name: "x".to_string(),
            at: Utc::now(),
        }]);
        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[1].event_type(), "TestRenamed");

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_uncommitted_events_merge_children() {
        let aggregate = aggregate();
        let events = aggregate.uncommitted_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "TestCreated");
        assert_eq!(events[1].event_type(), "TestRenamed");
        assert!(aggregate.has_uncommitted_events());
    }

    #[test]
    fn test_mark_committed_cascades() {
        let mut aggregate = aggregate();
        aggregate.mark_events_as_committed();
        assert!(!aggregate.has_uncommitted_events());
        assert!(aggregate.children[0].events.is_empty());
    }

    #[test]
    fn test_event_log_is_not_serialized() {
        let aggregate = aggregate();
        let json = serde_json::to_value(&aggregate).unwrap();
        assert!(json.get("events").is_none());

        let restored: TestAggregate = serde_json::from_value(json).unwrap();
        assert!(!restored.has_uncommitted_events());
        assert_eq!(restored.children[0].name, "child");
    }
}
