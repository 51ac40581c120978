use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{AggregateId, Version};

/// The persisted state of one aggregate.
///
/// `state` holds the aggregate's serialized snapshot; the store treats it as
/// opaque JSON and only guards it with `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// The aggregate this record belongs to.
    pub aggregate_id: AggregateId,

    /// The type of aggregate (e.g., "Cart", "Product").
    pub aggregate_type: String,

    /// Version of the record. Set by the store on save.
    pub version: Version,

    /// When the record was last written.
    pub saved_at: DateTime<Utc>,

    /// The serialized aggregate state.
    pub state: serde_json::Value,
}

impl AggregateRecord {
    /// Builds a record from a serializable aggregate.
    pub fn from_state<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version: Version::initial(),
            saved_at: Utc::now(),
            state: serde_json::to_value(state)?,
        })
    }

    /// Deserializes the stored state.
    pub fn to_state<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state.clone())
    }
}
