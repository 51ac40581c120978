//! Domain error types.
//!
//! The domain layer raises exactly two kinds of failure: structurally invalid
//! input ([`ValidationError`]) and well-formed input that conflicts with the
//! current aggregate state ([`BusinessRuleViolation`]).

use common::{IdParseError, ProductVariantId, UserId};
use store::StoreError;
use thiserror::Error;

use crate::money::{Currency, Money};

/// Input is invalid regardless of aggregate state.
///
/// Retrying with the same input will always fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {field}: {message}")]
pub struct ValidationError {
    /// The field or argument that was rejected.
    pub field: &'static str,

    /// Human-readable reason.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Input is well-formed but the operation conflicts with the current state.
///
/// A retry may succeed once the state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusinessRuleViolation {
    /// The aggregate is not in a status that allows the operation.
    #[error("Cannot {action} while status is {status}")]
    InvalidStatus {
        action: &'static str,
        status: &'static str,
    },

    /// Money in a different currency was mixed into the aggregate.
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: Currency, actual: Currency },

    /// A line quantity would exceed the per-item maximum.
    #[error("Quantity {requested} exceeds the maximum of {max} per item")]
    QuantityLimitExceeded { requested: u32, max: u32 },

    /// The discount code is already applied to the cart.
    #[error("Discount code {0} is already applied")]
    DiscountAlreadyApplied(String),

    /// The cart subtotal is below the discount's minimum amount.
    #[error("Discount requires a minimum of {minimum}, cart subtotal is {subtotal}")]
    MinimumAmountNotMet { minimum: Money, subtotal: Money },

    /// A user already owns the cart.
    #[error("Cart is already assigned to user {0}")]
    UserAlreadyAssigned(UserId),

    /// The cart has no items.
    #[error("Cart has no items")]
    EmptyCart,

    /// A variant with the same id already belongs to the product.
    #[error("Variant {0} already exists on this product")]
    DuplicateVariant(ProductVariantId),

    /// Another variant of the product already uses the SKU.
    #[error("SKU {0} is already used by another variant")]
    DuplicateSku(String),

    /// The image URL is already attached to the product.
    #[error("Image {0} is already attached to this product")]
    DuplicateImage(String),

    /// Removing the variant would leave the product without variants.
    #[error("Cannot remove the last remaining variant")]
    LastVariant,

    /// The product has no variants to sell.
    #[error("Product has no variants")]
    NoVariants,

    /// Not enough tracked stock to satisfy the request.
    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },
}

/// Errors raised by aggregates, entities, and value objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    BusinessRule(#[from] BusinessRuleViolation),
}

impl DomainError {
    /// Shorthand for a [`ValidationError`].
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(field, message))
    }

    /// Returns true for structurally invalid input.
    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Validation(_))
    }

    /// Returns true for state-dependent policy violations.
    pub fn is_business_rule(&self) -> bool {
        matches!(self, DomainError::BusinessRule(_))
    }
}

impl From<IdParseError> for DomainError {
    fn from(err: IdParseError) -> Self {
        DomainError::validation(err.kind, err.to_string())
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Errors surfaced by the application services that load and save aggregates.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The aggregate rejected the command.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// An error occurred in the aggregate store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    /// Returns true if the save lost an optimistic concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Store(err) if err.is_conflict())
    }

    /// Returns the domain error, if the command was rejected by the aggregate.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            _ => None,
        }
    }
}
