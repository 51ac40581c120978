//! Product domain events.

use chrono::{DateTime, Utc};
use common::{ProductCategoryId, ProductId, ProductVariantId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::money::Money;

use super::ProductStatus;

/// Events recorded by a product and its variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    /// Product was created as a draft.
    ProductCreated(ProductCreatedData),

    /// Catalog fields changed.
    ProductUpdated(ProductUpdatedData),

    ProductPublished(ProductPublishedData),
    ProductUnpublished(ProductUnpublishedData),
    ProductArchived(ProductArchivedData),
    ProductVariantAdded(ProductVariantAddedData),
    ProductVariantRemoved(ProductVariantRemovedData),

    /// Variant fields other than price and stock changed.
    ProductVariantUpdated(ProductVariantUpdatedData),
    ProductVariantPriceChanged(ProductVariantPriceChangedData),

    /// Stock on hand for a variant changed.
    ProductInventoryChanged(ProductInventoryChangedData),
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "ProductCreated",
            ProductEvent::ProductUpdated(_) => "ProductUpdated",
            ProductEvent::ProductPublished(_) => "ProductPublished",
            ProductEvent::ProductUnpublished(_) => "ProductUnpublished",
            ProductEvent::ProductArchived(_) => "ProductArchived",
            ProductEvent::ProductVariantAdded(_) => "ProductVariantAdded",
            ProductEvent::ProductVariantRemoved(_) => "ProductVariantRemoved",
            ProductEvent::ProductVariantUpdated(_) => "ProductVariantUpdated",
            ProductEvent::ProductVariantPriceChanged(_) => "ProductVariantPriceChanged",
            ProductEvent::ProductInventoryChanged(_) => "ProductInventoryChanged",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(data) => data.occurred_at,
            ProductEvent::ProductUpdated(data) => data.occurred_at,
            ProductEvent::ProductPublished(data) => data.occurred_at,
            ProductEvent::ProductUnpublished(data) => data.occurred_at,
            ProductEvent::ProductArchived(data) => data.occurred_at,
            ProductEvent::ProductVariantAdded(data) => data.occurred_at,
            ProductEvent::ProductVariantRemoved(data) => data.occurred_at,
            ProductEvent::ProductVariantUpdated(data) => data.occurred_at,
            ProductEvent::ProductVariantPriceChanged(data) => data.occurred_at,
            ProductEvent::ProductInventoryChanged(data) => data.occurred_at,
        }
    }
}

impl ProductEvent {
    /// Returns the product the event belongs to.
    pub fn product_id(&self) -> ProductId {
        match self {
            ProductEvent::ProductCreated(data) => data.product_id,
            ProductEvent::ProductUpdated(data) => data.product_id,
            ProductEvent::ProductPublished(data) => data.product_id,
            ProductEvent::ProductUnpublished(data) => data.product_id,
            ProductEvent::ProductArchived(data) => data.product_id,
            ProductEvent::ProductVariantAdded(data) => data.product_id,
            ProductEvent::ProductVariantRemoved(data) => data.product_id,
            ProductEvent::ProductVariantUpdated(data) => data.product_id,
            ProductEvent::ProductVariantPriceChanged(data) => data.product_id,
            ProductEvent::ProductInventoryChanged(data) => data.product_id,
        }
    }
}

/// Data for ProductCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCreatedData {
    pub product_id: ProductId,
    pub title: String,
    pub handle: String,
    pub category_ids: Vec<ProductCategoryId>,
    pub occurred_at: DateTime<Utc>,
}

/// Data for ProductUpdated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdatedData {
    pub product_id: ProductId,

    /// Names of the fields that changed, e.g. `["title", "description"]`.
    pub changed_fields: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Data for ProductPublished event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPublishedData {
    pub product_id: ProductId,
    pub previous_status: ProductStatus,
    pub published_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Data for ProductUnpublished event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUnpublishedData {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Data for ProductArchived event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductArchivedData {
    pub product_id: ProductId,
    pub previous_status: ProductStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Data for ProductVariantAdded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariantAddedData {
    pub product_id: ProductId,
    pub variant_id: ProductVariantId,
    pub sku: String,
    pub price: Money,
    pub inventory_quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Data for ProductVariantRemoved event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariantRemovedData {
    pub product_id: ProductId,
    pub variant_id: ProductVariantId,
    pub sku: String,
    pub occurred_at: DateTime<Utc>,
}

/// Data for ProductVariantUpdated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariantUpdatedData {
    pub product_id: ProductId,
    pub variant_id: ProductVariantId,
    pub changed_fields: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Data for ProductVariantPriceChanged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariantPriceChangedData {
    pub product_id: ProductId,
    pub variant_id: ProductVariantId,
    pub old_price: Money,
    pub new_price: Money,
    pub compare_at_price: Option<Money>,
    pub occurred_at: DateTime<Utc>,
}

/// Data for ProductInventoryChanged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInventoryChangedData {
    pub product_id: ProductId,
    pub variant_id: ProductVariantId,
    pub old_quantity: u32,
    pub new_quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_event_type_and_product_id() {
        let product_id = ProductId::new();
        let event = ProductEvent::ProductInventoryChanged(ProductInventoryChangedData {
            product_id,
            variant_id: ProductVariantId::new(),
            old_quantity: 10,
            new_quantity: 7,
            occurred_at: Utc::now(),
        });
        assert_eq!(event.event_type(), "ProductInventoryChanged");
        assert_eq!(event.product_id(), product_id);
    }

    #[test]
    fn test_event_serialization() {
        let event = ProductEvent::ProductVariantAdded(ProductVariantAddedData {
            product_id: ProductId::new(),
            variant_id: ProductVariantId::new(),
            sku: "MUG-RED".to_string(),
            price: Money::new(1299, Currency::USD),
            inventory_quantity: 5,
            occurred_at: Utc::now(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ProductVariantAdded");
        assert_eq!(json["data"]["sku"], "MUG-RED");
        assert_eq!(json["data"]["price"]["decimal_amount"], 12.99);

        let back: ProductEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
