use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AggregateId, EventId};

/// Version number of a stored aggregate, used for optimistic concurrency.
///
/// A record that does not exist yet is at version 0. Every successful save
/// moves the record to the next version, regardless of how many events the
/// save carried.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The version of an aggregate that has never been saved.
    pub fn initial() -> Self {
        Self(0)
    }

    /// The version written by the first save.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// An outbox entry: a serialized domain event plus the metadata a dispatcher
/// needs to route it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// The type of the event (e.g., "CartItemAdded").
    pub event_type: String,

    /// The aggregate that recorded the event.
    pub aggregate_id: AggregateId,

    /// The type of aggregate (e.g., "Cart", "Product").
    pub aggregate_type: String,

    /// Version of the aggregate record written together with this event.
    pub version: Version,

    /// Position of the event inside the save that produced it.
    pub sequence: u32,

    /// When the domain event happened.
    pub occurred_at: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,

    /// Free-form routing metadata (correlation ids and the like).
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl EventEnvelope {
    /// Wraps a serializable event.
    pub fn wrap<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        occurred_at: DateTime<Utc>,
        event: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version: Version::initial(),
            sequence: 0,
            occurred_at,
            payload: serde_json::to_value(event)?,
            metadata: BTreeMap::new(),
        })
    }

    /// Stamps the envelope with its position in a save.
    pub fn at(mut self, version: Version, sequence: u32) -> Self {
        self.version = version;
        self.sequence = sequence;
        self
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Deserializes the payload back into a typed event.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}
