//! Cart line item entity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, ProductId, ProductVariantId};
use serde::{Deserialize, Serialize};

use crate::aggregate::EventLog;
use crate::error::{DomainResult, ValidationError};
use crate::money::Money;
use crate::validation::{price_pair, required_text};

use super::events::{CartEvent, CartItemPriceChangedData, CartItemQuantityChangedData};

/// Largest quantity a single cart line may hold.
pub const MAX_ITEM_QUANTITY: u32 = 999;

/// Checks that a line quantity is within `1..=MAX_ITEM_QUANTITY`.
pub fn validate_quantity(quantity: u32) -> Result<u32, ValidationError> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&quantity) {
        return Err(ValidationError::new(
            "quantity",
            format!("must be between 1 and {MAX_ITEM_QUANTITY} (got {quantity})"),
        ));
    }
    Ok(quantity)
}

/// Everything needed to put a product variant into a cart.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub variant_id: ProductVariantId,
    pub product_title: String,
    pub variant_title: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub compare_at_price: Option<Money>,
    pub image: Option<String>,
    pub slug: Option<String>,
    pub options: BTreeMap<String, String>,
}

impl NewCartItem {
    pub fn new(
        product_id: ProductId,
        variant_id: ProductVariantId,
        product_title: impl Into<String>,
        variant_title: impl Into<String>,
        sku: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            variant_id,
            product_title: product_title.into(),
            variant_title: variant_title.into(),
            sku: sku.into(),
            quantity,
            unit_price,
            compare_at_price: None,
            image: None,
            slug: None,
            options: BTreeMap::new(),
        }
    }

    pub fn with_compare_at_price(mut self, compare_at_price: Money) -> Self {
        self.compare_at_price = Some(compare_at_price);
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Adds a selected option such as `("Size", "M")`.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}

/// One product variant line inside a cart.
///
/// Owned by [`Cart`](super::Cart); only the cart hands out mutable access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    variant_id: ProductVariantId,
    product_title: String,
    variant_title: String,
    sku: String,
    quantity: u32,
    unit_price: Money,
    compare_at_price: Option<Money>,
    image: Option<String>,
    slug: Option<String>,
    #[serde(default)]
    options: BTreeMap<String, String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: EventLog<CartEvent>,
}

impl CartItem {
    /// Validates the details and creates a line for `cart_id`.
    pub fn create(cart_id: CartId, details: NewCartItem) -> DomainResult<Self> {
        let product_title = required_text("product_title", details.product_title)?;
        let variant_title = required_text("variant_title", details.variant_title)?;
        let sku = required_text("sku", details.sku)?;
        let quantity = validate_quantity(details.quantity)?;
        price_pair(details.unit_price, details.compare_at_price)?;

        let now = Utc::now();
        Ok(Self {
            id: CartItemId::new(),
            cart_id,
            product_id: details.product_id,
            variant_id: details.variant_id,
            product_title,
            variant_title,
            sku,
            quantity,
            unit_price: details.unit_price,
            compare_at_price: details.compare_at_price,
            image: details.image,
            slug: details.slug,
            options: details.options,
            created_at: now,
            updated_at: now,
            events: EventLog::new(),
        })
    }

    /// Re-checks field invariants on a line read back from storage.
    pub(crate) fn validated(mut self) -> DomainResult<Self> {
        self.product_title = required_text("product_title", self.product_title)?;
        self.variant_title = required_text("variant_title", self.variant_title)?;
        self.sku = required_text("sku", self.sku)?;
        validate_quantity(self.quantity)?;
        price_pair(self.unit_price, self.compare_at_price)?;
        Ok(self)
    }

    pub fn id(&self) -> CartItemId {
        self.id
    }

    pub fn cart_id(&self) -> CartId {
        self.cart_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn variant_id(&self) -> ProductVariantId {
        self.variant_id
    }

    pub fn product_title(&self) -> &str {
        &self.product_title
    }

    pub fn variant_title(&self) -> &str {
        &self.variant_title
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn compare_at_price(&self) -> Option<Money> {
        self.compare_at_price
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns unit price times quantity.
    ///
    /// The unit price is capped at `MAX_PRICE_AMOUNT` and the quantity at
    /// [`MAX_ITEM_QUANTITY`], so the product fits in an `i64`.
    pub fn total_price(&self) -> Money {
        self.unit_price.saturating_multiply(self.quantity)
    }

    /// Returns true if a compare-at price above the unit price is set.
    pub fn is_on_sale(&self) -> bool {
        self.compare_at_price
            .is_some_and(|compare_at| compare_at > self.unit_price)
    }

    /// Returns the savings against the compare-at price for the whole line.
    pub fn discount_amount(&self) -> Money {
        match self.compare_at_price {
            Some(compare_at) if self.is_on_sale() => Money::new(
                compare_at.amount() - self.unit_price.amount(),
                self.unit_price.currency(),
            )
            .saturating_multiply(self.quantity),
            _ => Money::zero(self.unit_price.currency()),
        }
    }

    /// Returns the per-unit savings as a percentage of the compare-at price.
    pub fn discount_percentage(&self) -> f64 {
        match self.compare_at_price {
            Some(compare_at) if self.is_on_sale() => {
                (compare_at.amount() - self.unit_price.amount()) as f64
                    / compare_at.amount() as f64
                    * 100.0
            }
            _ => 0.0,
        }
    }

    /// Returns true if this line holds the given product variant.
    pub fn is_same_product(&self, product_id: ProductId, variant_id: ProductVariantId) -> bool {
        self.product_id == product_id && self.variant_id == variant_id
    }

    /// Sets a new quantity within `1..=MAX_ITEM_QUANTITY`.
    ///
    /// Setting the current quantity again is a no-op.
    pub fn update_quantity(&mut self, quantity: u32) -> DomainResult<()> {
        let quantity = validate_quantity(quantity)?;
        if quantity == self.quantity {
            return Ok(());
        }

        let now = Utc::now();
        self.events
            .record(CartEvent::CartItemQuantityChanged(CartItemQuantityChangedData {
                cart_id: self.cart_id,
                item_id: self.id,
                old_quantity: self.quantity,
                new_quantity: quantity,
                occurred_at: now,
            }));
        self.quantity = quantity;
        self.updated_at = now;
        Ok(())
    }

    /// Replaces the unit price. Omitting `compare_at_price` clears it.
    pub fn update_price(
        &mut self,
        unit_price: Money,
        compare_at_price: Option<Money>,
    ) -> DomainResult<()> {
        price_pair(unit_price, compare_at_price)?;
        if unit_price == self.unit_price && compare_at_price == self.compare_at_price {
            return Ok(());
        }

        let now = Utc::now();
        self.events
            .record(CartEvent::CartItemPriceChanged(CartItemPriceChangedData {
                cart_id: self.cart_id,
                item_id: self.id,
                old_price: self.unit_price,
                new_price: unit_price,
                compare_at_price,
                occurred_at: now,
            }));
        self.unit_price = unit_price;
        self.compare_at_price = compare_at_price;
        self.updated_at = now;
        Ok(())
    }

    /// Events recorded by this line and not yet committed.
    pub fn pending_events(&self) -> &[CartEvent] {
        self.events.events()
    }

    pub(crate) fn take_events(&mut self) -> Vec<CartEvent> {
        self.events.drain()
    }

    pub(crate) fn clear_events(&mut self) {
        self.events.clear();
    }
}
