//! Shared identifier types for the commerce workspace.

pub mod types;

pub use types::{
    AggregateId, CartId, CartItemId, EventId, IdParseError, ProductCategoryId, ProductId,
    ProductVariantId, UserId,
};
