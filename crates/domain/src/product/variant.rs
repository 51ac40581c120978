//! Product variant entity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{ProductId, ProductVariantId};
use serde::{Deserialize, Serialize};

use crate::aggregate::EventLog;
use crate::error::{BusinessRuleViolation, DomainResult, ValidationError};
use crate::money::Money;
use crate::validation::{price_pair, required_text};

use super::{
    AvailabilityStatus, ProductDimensions, ProductEvent,
    events::{ProductInventoryChangedData, ProductVariantPriceChangedData, ProductVariantUpdatedData},
};

/// Everything needed to add a variant to a product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProductVariant {
    pub title: String,
    pub sku: String,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub inventory_quantity: u32,
    pub inventory_management: bool,
    pub allow_backorder: bool,
    pub options: BTreeMap<String, String>,
    pub barcode: Option<String>,
    pub weight: Option<f64>,
    pub dimensions: Option<ProductDimensions>,
}

impl NewProductVariant {
    /// Starts a tracked-inventory variant with no stock.
    pub fn new(title: impl Into<String>, sku: impl Into<String>, price: Money) -> Self {
        Self {
            title: title.into(),
            sku: sku.into(),
            price,
            compare_at_price: None,
            inventory_quantity: 0,
            inventory_management: true,
            allow_backorder: false,
            options: BTreeMap::new(),
            barcode: None,
            weight: None,
            dimensions: None,
        }
    }

    pub fn with_compare_at_price(mut self, compare_at_price: Money) -> Self {
        self.compare_at_price = Some(compare_at_price);
        self
    }

    pub fn with_inventory(mut self, quantity: u32) -> Self {
        self.inventory_quantity = quantity;
        self
    }

    /// Turns stock tracking on or off.
    pub fn with_inventory_management(mut self, enabled: bool) -> Self {
        self.inventory_management = enabled;
        self
    }

    pub fn with_backorder(mut self, allowed: bool) -> Self {
        self.allow_backorder = allowed;
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_dimensions(mut self, dimensions: ProductDimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

/// Partial update for a variant. `None` leaves a field unchanged.
///
/// For optional fields the inner `Option` is the new value, so
/// `compare_at_price: Some(None)` clears the compare-at price.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantUpdate {
    pub title: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Money>,
    pub compare_at_price: Option<Option<Money>>,
    pub inventory_quantity: Option<u32>,
    pub inventory_management: Option<bool>,
    pub allow_backorder: Option<bool>,
    pub options: Option<BTreeMap<String, String>>,
    pub barcode: Option<Option<String>>,
    pub weight: Option<Option<f64>>,
    pub dimensions: Option<Option<ProductDimensions>>,
}

impl VariantUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One purchasable version of a product, such as a size or color.
///
/// Owned by [`Product`](super::Product); `product_id` never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    id: ProductVariantId,
    product_id: ProductId,
    title: String,
    sku: String,
    price: Money,
    compare_at_price: Option<Money>,
    inventory_quantity: u32,
    inventory_management: bool,
    allow_backorder: bool,
    #[serde(default)]
    options: BTreeMap<String, String>,
    barcode: Option<String>,
    weight: Option<f64>,
    dimensions: Option<ProductDimensions>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: EventLog<ProductEvent>,
}

fn validate_weight(weight: Option<f64>) -> Result<Option<f64>, ValidationError> {
    match weight {
        Some(w) if !w.is_finite() || w <= 0.0 => Err(ValidationError::new(
            "weight",
            format!("must be greater than zero (got {w})"),
        )),
        _ => Ok(weight),
    }
}

impl ProductVariant {
    /// Validates the details and creates a variant of `product_id`.
    pub fn create(product_id: ProductId, details: NewProductVariant) -> DomainResult<Self> {
        let now = Utc::now();
        Self {
            id: ProductVariantId::new(),
            product_id,
            title: details.title,
            sku: details.sku,
            price: details.price,
            compare_at_price: details.compare_at_price,
            inventory_quantity: details.inventory_quantity,
            inventory_management: details.inventory_management,
            allow_backorder: details.allow_backorder,
            options: details.options,
            barcode: details.barcode,
            weight: details.weight,
            dimensions: details.dimensions,
            created_at: now,
            updated_at: now,
            events: EventLog::new(),
        }
        .validated()
    }

    /// Checks every field; also used for variants read back from storage.
    pub(crate) fn validated(mut self) -> DomainResult<Self> {
        self.title = required_text("title", self.title)?;
        self.sku = required_text("sku", self.sku)?;
        price_pair(self.price, self.compare_at_price)?;
        self.barcode = self
            .barcode
            .map(|barcode| required_text("barcode", barcode))
            .transpose()?;
        self.weight = validate_weight(self.weight)?;
        self.dimensions = self
            .dimensions
            .map(ProductDimensions::validated)
            .transpose()?;
        Ok(self)
    }

    pub fn id(&self) -> ProductVariantId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn compare_at_price(&self) -> Option<Money> {
        self.compare_at_price
    }

    pub fn inventory_quantity(&self) -> u32 {
        self.inventory_quantity
    }

    pub fn inventory_management(&self) -> bool {
        self.inventory_management
    }

    pub fn allow_backorder(&self) -> bool {
        self.allow_backorder
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    pub fn dimensions(&self) -> Option<&ProductDimensions> {
        self.dimensions.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_on_sale(&self) -> bool {
        self.compare_at_price
            .is_some_and(|compare_at| compare_at > self.price)
    }

    /// Returns true if `quantity` units can be sold right now.
    pub fn is_available(&self, quantity: u32) -> bool {
        !self.inventory_management || self.allow_backorder || self.inventory_quantity >= quantity
    }

    pub fn availability_status(&self) -> AvailabilityStatus {
        if !self.inventory_management || self.inventory_quantity > 0 {
            AvailabilityStatus::InStock
        } else if self.allow_backorder {
            AvailabilityStatus::PreOrder
        } else {
            AvailabilityStatus::OutOfStock
        }
    }

    /// Replaces the price. Omitting `compare_at_price` clears it.
    ///
    /// The currency cannot change.
    pub fn update_price(&mut self, price: Money, compare_at_price: Option<Money>) -> DomainResult<()> {
        self.price.ensure_same_currency(&price)?;
        price_pair(price, compare_at_price)?;
        if price == self.price && compare_at_price == self.compare_at_price {
            return Ok(());
        }

        let now = Utc::now();
        self.events
            .record(ProductEvent::ProductVariantPriceChanged(ProductVariantPriceChangedData {
                product_id: self.product_id,
                variant_id: self.id,
                old_price: self.price,
                new_price: price,
                compare_at_price,
                occurred_at: now,
            }));
        self.price = price;
        self.compare_at_price = compare_at_price;
        self.updated_at = now;
        Ok(())
    }

    /// Sets stock on hand. Setting the current quantity again is a no-op.
    pub fn update_inventory(&mut self, quantity: u32) -> DomainResult<()> {
        if quantity == self.inventory_quantity {
            return Ok(());
        }
        self.set_inventory(quantity);
        Ok(())
    }

    /// Takes `quantity` units out of stock.
    ///
    /// Tracked variants without backorders fail with `InsufficientInventory`
    /// when stock is short. Otherwise stock is reduced but never below zero.
    pub fn reduce_inventory(&mut self, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(ValidationError::new("quantity", "must be greater than zero").into());
        }
        if self.inventory_management && !self.allow_backorder && quantity > self.inventory_quantity {
            return Err(BusinessRuleViolation::InsufficientInventory {
                requested: quantity,
                available: self.inventory_quantity,
            }
            .into());
        }

        let remaining = self.inventory_quantity.saturating_sub(quantity);
        if remaining != self.inventory_quantity {
            self.set_inventory(remaining);
        }
        Ok(())
    }

    fn set_inventory(&mut self, quantity: u32) {
        let now = Utc::now();
        self.events
            .record(ProductEvent::ProductInventoryChanged(ProductInventoryChangedData {
                product_id: self.product_id,
                variant_id: self.id,
                old_quantity: self.inventory_quantity,
                new_quantity: quantity,
                occurred_at: now,
            }));
        self.inventory_quantity = quantity;
        self.updated_at = now;
    }

    /// Applies a partial update field by field.
    ///
    /// Stops at the first invalid field, leaving earlier fields applied;
    /// [`Product::update_variant`](super::Product::update_variant) applies it
    /// to a copy so the product only sees complete updates.
    pub fn apply_update(&mut self, update: VariantUpdate) -> DomainResult<()> {
        let mut changed: Vec<String> = Vec::new();

        if let Some(title) = update.title {
            let title = required_text("title", title)?;
            if title != self.title {
                self.title = title;
                changed.push("title".into());
            }
        }
        if let Some(sku) = update.sku {
            let sku = required_text("sku", sku)?;
            if sku != self.sku {
                self.sku = sku;
                changed.push("sku".into());
            }
        }
        if update.price.is_some() || update.compare_at_price.is_some() {
            let price = update.price.unwrap_or(self.price);
            let compare_at_price = update.compare_at_price.unwrap_or(self.compare_at_price);
            self.update_price(price, compare_at_price)?;
        }
        if let Some(quantity) = update.inventory_quantity {
            self.update_inventory(quantity)?;
        }
        if let Some(enabled) = update.inventory_management
            && enabled != self.inventory_management
        {
            self.inventory_management = enabled;
            changed.push("inventory_management".into());
        }
        if let Some(allowed) = update.allow_backorder
            && allowed != self.allow_backorder
        {
            self.allow_backorder = allowed;
            changed.push("allow_backorder".into());
        }
        if let Some(options) = update.options
            && options != self.options
        {
            self.options = options;
            changed.push("options".into());
        }
        if let Some(barcode) = update.barcode {
            let barcode = barcode
                .map(|b| required_text("barcode", b))
                .transpose()?;
            if barcode != self.barcode {
                self.barcode = barcode;
                changed.push("barcode".into());
            }
        }
        if let Some(weight) = update.weight {
            let weight = validate_weight(weight)?;
            if weight != self.weight {
                self.weight = weight;
                changed.push("weight".into());
            }
        }
        if let Some(dimensions) = update.dimensions {
            let dimensions = dimensions.map(ProductDimensions::validated).transpose()?;
            if dimensions != self.dimensions {
                self.dimensions = dimensions;
                changed.push("dimensions".into());
            }
        }

        if !changed.is_empty() {
            let now = Utc::now();
            self.events
                .record(ProductEvent::ProductVariantUpdated(ProductVariantUpdatedData {
                    product_id: self.product_id,
                    variant_id: self.id,
                    changed_fields: changed,
                    occurred_at: now,
                }));
            self.updated_at = now;
        }
        Ok(())
    }

    /// Events recorded by this variant and not yet committed.
    pub fn pending_events(&self) -> &[ProductEvent] {
        self.events.events()
    }

    pub(crate) fn take_events(&mut self) -> Vec<ProductEvent> {
        self.events.drain()
    }

    pub(crate) fn clear_events(&mut self) {
        self.events.clear();
    }
}
