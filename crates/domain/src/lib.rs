//! Commerce domain layer.
//!
//! This crate provides:
//! - `Money` and `Currency` value types
//! - The `Cart` aggregate with its items, discounts, and shipping
//! - The `Product` aggregate with its variants, images, and SEO metadata
//! - Domain events and the validation / business rule error taxonomy
//! - `CommandHandler` and the cart and product services that load, mutate,
//!   and save aggregates through an `AggregateStore`

pub mod aggregate;
pub mod cart;
pub mod command;
pub mod config;
pub mod error;
pub mod money;
pub mod product;
mod validation;

pub use aggregate::{AggregateRoot, DomainEvent, EventLog};
pub use cart::{
    Cart, CartDiscount, CartEvent, CartItem, CartOwner, CartService, CartStatus, CartTotals,
    DiscountValue, MAX_ITEM_QUANTITY, NewCartItem, ShippingInformation,
};
pub use command::{CORRELATION_ID_KEY, CommandHandler, CommandResult};
pub use config::{CommerceConfig, MAX_CART_TTL_DAYS};
pub use error::{BusinessRuleViolation, DomainError, DomainResult, ServiceError, ValidationError};
pub use money::{Currency, MAX_PRICE_AMOUNT, Money};
pub use product::{
    AvailabilityStatus, NewProductVariant, PriceRange, Product, ProductDimensions, ProductEvent,
    ProductImage, ProductSeo, ProductService, ProductStatus, ProductSummary, ProductVariant,
    VariantUpdate,
};
