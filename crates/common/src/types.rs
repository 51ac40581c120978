use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a string cannot be parsed into an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind}: {value:?} is not a valid UUID")]
pub struct IdParseError {
    /// Name of the identifier type that failed to parse.
    pub kind: &'static str,

    /// The rejected input.
    pub value: String,
}

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| IdParseError {
                        kind: stringify!($name),
                        value: s.to_string(),
                    })
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for an aggregate instance.
    ///
    /// Storage is keyed by this type; every aggregate-specific identifier
    /// converts into it.
    AggregateId
);

uuid_identifier!(
    /// Identifier of a shopping cart.
    CartId
);

uuid_identifier!(
    /// Identifier of a line item inside a cart.
    CartItemId
);

uuid_identifier!(
    /// Identifier of a catalog product.
    ProductId
);

uuid_identifier!(
    /// Identifier of a purchasable product variant.
    ProductVariantId
);

uuid_identifier!(
    /// Identifier of a product category.
    ProductCategoryId
);

uuid_identifier!(
    /// Identifier of an authenticated user.
    UserId
);

uuid_identifier!(
    /// Identifier of a recorded domain event.
    EventId
);

impl From<CartId> for AggregateId {
    fn from(id: CartId) -> Self {
        Self(id.0)
    }
}

impl From<ProductId> for AggregateId {
    fn from(id: ProductId) -> Self {
        Self(id.0)
    }
}
