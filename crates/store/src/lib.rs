//! Persistence call shapes for the commerce domain.
//!
//! Aggregates are stored as serialized state records guarded by a version
//! number. Events recorded by an aggregate are appended to an outbox in the
//! same atomic save, ready for an external dispatcher.

pub mod error;
pub mod event;
pub mod memory;
pub mod record;
pub mod store;

pub use common::{AggregateId, EventId};
pub use error::{Result, StoreError};
pub use event::{EventEnvelope, Version};
pub use memory::InMemoryAggregateStore;
pub use record::AggregateRecord;
pub use store::{AggregateStore, AggregateStoreExt, SaveOptions};
