//! Product lifecycle and stock availability.

use serde::{Deserialize, Serialize};

/// The publication status of a product.
///
/// State transitions:
/// ```text
/// Draft ──► Active ◄──► Inactive
///   │         │            │
///   └─────────┴─────┬──────┘
///                   ▼
///               Archived
/// ```
/// An archived product can be published again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    /// Being prepared; not visible to shoppers.
    #[default]
    Draft,

    /// Published and purchasable.
    Active,

    /// Temporarily hidden.
    Inactive,

    /// Retired from the catalog.
    Archived,
}

impl ProductStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ProductStatus::Active)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "DRAFT",
            ProductStatus::Active => "ACTIVE",
            ProductStatus::Inactive => "INACTIVE",
            ProductStatus::Archived => "ARCHIVED",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a product or variant can be bought right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    InStock,
    OutOfStock,

    /// Out of stock, but backorders are accepted.
    PreOrder,

    /// The product is not published.
    Discontinued,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::InStock => "IN_STOCK",
            AvailabilityStatus::OutOfStock => "OUT_OF_STOCK",
            AvailabilityStatus::PreOrder => "PRE_ORDER",
            AvailabilityStatus::Discontinued => "DISCONTINUED",
        }
    }
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
