//! Cart domain events.

use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, ProductId, ProductVariantId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::money::{Currency, Money};

use super::{CartDiscount, CartItem};

/// Events recorded by a cart and its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    /// Cart was created.
    CartCreated(CartCreatedData),

    /// A new line was added to the cart.
    CartItemAdded(CartItemAddedData),

    /// A line was removed from the cart.
    CartItemRemoved(CartItemRemovedData),

    /// A line quantity changed.
    CartItemQuantityChanged(CartItemQuantityChangedData),

    /// A line price changed.
    CartItemPriceChanged(CartItemPriceChangedData),

    /// All lines were removed at once.
    CartCleared(CartClearedData),

    /// A discount code was applied.
    CartDiscountApplied(CartDiscountAppliedData),

    /// A discount code was removed.
    CartDiscountRemoved(CartDiscountRemovedData),

    /// A guest cart was taken over by a signed-in user.
    CartAssignedToUser(CartAssignedToUserData),

    /// Cart was abandoned.
    CartAbandoned(CartAbandonedData),

    /// Cart was checked out.
    CartCompleted(CartCompletedData),

    /// Cart expired.
    CartExpired(CartExpiredData),
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::CartCreated(_) => "CartCreated",
            CartEvent::CartItemAdded(_) => "CartItemAdded",
            CartEvent::CartItemRemoved(_) => "CartItemRemoved",
            CartEvent::CartItemQuantityChanged(_) => "CartItemQuantityChanged",
            CartEvent::CartItemPriceChanged(_) => "CartItemPriceChanged",
            CartEvent::CartCleared(_) => "CartCleared",
            CartEvent::CartDiscountApplied(_) => "CartDiscountApplied",
            CartEvent::CartDiscountRemoved(_) => "CartDiscountRemoved",
            CartEvent::CartAssignedToUser(_) => "CartAssignedToUser",
            CartEvent::CartAbandoned(_) => "CartAbandoned",
            CartEvent::CartCompleted(_) => "CartCompleted",
            CartEvent::CartExpired(_) => "CartExpired",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CartEvent::CartCreated(data) => data.occurred_at,
            CartEvent::CartItemAdded(data) => data.occurred_at,
            CartEvent::CartItemRemoved(data) => data.occurred_at,
            CartEvent::CartItemQuantityChanged(data) => data.occurred_at,
            CartEvent::CartItemPriceChanged(data) => data.occurred_at,
            CartEvent::CartCleared(data) => data.occurred_at,
            CartEvent::CartDiscountApplied(data) => data.occurred_at,
            CartEvent::CartDiscountRemoved(data) => data.occurred_at,
            CartEvent::CartAssignedToUser(data) => data.occurred_at,
            CartEvent::CartAbandoned(data) => data.occurred_at,
            CartEvent::CartCompleted(data) => data.occurred_at,
            CartEvent::CartExpired(data) => data.occurred_at,
        }
    }
}

impl CartEvent {
    /// Returns the cart the event belongs to.
    pub fn cart_id(&self) -> CartId {
        match self {
            CartEvent::CartCreated(data) => data.cart_id,
            CartEvent::CartItemAdded(data) => data.cart_id,
            CartEvent::CartItemRemoved(data) => data.cart_id,
            CartEvent::CartItemQuantityChanged(data) => data.cart_id,
            CartEvent::CartItemPriceChanged(data) => data.cart_id,
            CartEvent::CartCleared(data) => data.cart_id,
            CartEvent::CartDiscountApplied(data) => data.cart_id,
            CartEvent::CartDiscountRemoved(data) => data.cart_id,
            CartEvent::CartAssignedToUser(data) => data.cart_id,
            CartEvent::CartAbandoned(data) => data.cart_id,
            CartEvent::CartCompleted(data) => data.cart_id,
            CartEvent::CartExpired(data) => data.cart_id,
        }
    }
}

/// Data for CartCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartCreatedData {
    pub cart_id: CartId,
    pub user_id: Option<UserId>,
    pub session_id: Option<String>,
    pub currency: Currency,
    pub expires_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Data for CartItemAdded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItemAddedData {
    pub cart_id: CartId,
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: ProductVariantId,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Data for CartItemRemoved event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItemRemovedData {
    pub cart_id: CartId,
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: ProductVariantId,

    /// Quantity the line held when it was removed.
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Data for CartItemQuantityChanged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItemQuantityChangedData {
    pub cart_id: CartId,
    pub item_id: CartItemId,
    pub old_quantity: u32,
    pub new_quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Data for CartItemPriceChanged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItemPriceChangedData {
    pub cart_id: CartId,
    pub item_id: CartItemId,
    pub old_price: Money,
    pub new_price: Money,
    pub compare_at_price: Option<Money>,
    pub occurred_at: DateTime<Utc>,
}

/// A removed line as it looked at the moment the cart was cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearedItem {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: ProductVariantId,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl From<&CartItem> for ClearedItem {
    fn from(item: &CartItem) -> Self {
        Self {
            item_id: item.id(),
            product_id: item.product_id(),
            variant_id: item.variant_id(),
            sku: item.sku().to_string(),
            quantity: item.quantity(),
            unit_price: item.unit_price(),
        }
    }
}

/// Data for CartCleared event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartClearedData {
    pub cart_id: CartId,
    pub removed_items: Vec<ClearedItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Data for CartDiscountApplied event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartDiscountAppliedData {
    pub cart_id: CartId,
    pub discount: CartDiscount,

    /// Discount amount against the subtotal at the time it was applied.
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Data for CartDiscountRemoved event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartDiscountRemovedData {
    pub cart_id: CartId,
    pub code: String,
    pub occurred_at: DateTime<Utc>,
}

/// Data for CartAssignedToUser event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartAssignedToUserData {
    pub cart_id: CartId,
    pub user_id: UserId,
    pub previous_session_id: String,
    pub occurred_at: DateTime<Utc>,
}

/// Data for CartAbandoned event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartAbandonedData {
    pub cart_id: CartId,
    pub item_count: usize,
    pub subtotal: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Data for CartCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartCompletedData {
    pub cart_id: CartId,
    pub item_count: usize,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Data for CartExpired event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartExpiredData {
    pub cart_id: CartId,
    pub expires_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}
