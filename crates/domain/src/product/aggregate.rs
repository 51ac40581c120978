//! Product aggregate implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use common::{AggregateId, ProductCategoryId, ProductId, ProductVariantId};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateRoot, EventLog};
use crate::error::{BusinessRuleViolation, DomainError, DomainResult, ValidationError};
use crate::money::{Currency, Money};
use crate::validation::{max_chars, required_text};

use super::{
    AvailabilityStatus, NewProductVariant, ProductEvent, ProductImage, ProductSeo, ProductStatus,
    ProductVariant, VariantUpdate,
    events::{
        ProductArchivedData, ProductCreatedData, ProductPublishedData, ProductUnpublishedData,
        ProductUpdatedData, ProductVariantAddedData, ProductVariantRemovedData,
    },
};

pub const TITLE_MAX_CHARS: usize = 255;
pub const DESCRIPTION_MAX_CHARS: usize = 5000;

static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("Invalid regex"));

fn validate_title(title: impl Into<String>) -> Result<String, ValidationError> {
    let title = required_text("title", title)?;
    max_chars("title", &title, TITLE_MAX_CHARS)?;
    Ok(title)
}

fn validate_handle(handle: impl Into<String>) -> Result<String, ValidationError> {
    let handle = required_text("handle", handle)?;
    if !HANDLE_RE.is_match(&handle) {
        return Err(ValidationError::new(
            "handle",
            format!("must be lowercase words joined by single hyphens (got {handle:?})"),
        ));
    }
    Ok(handle)
}

fn validate_description(description: impl Into<String>) -> Result<String, ValidationError> {
    let description = description.into().trim().to_string();
    max_chars("description", &description, DESCRIPTION_MAX_CHARS)?;
    Ok(description)
}

fn normalize_tag(tag: &str) -> Result<String, ValidationError> {
    Ok(required_text("tag", tag)?.to_lowercase())
}

fn optional_text(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<String>, ValidationError> {
    value.map(|v| required_text(field, v)).transpose()
}

/// Lowest and highest variant price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Money,
    pub max: Money,
}

/// Computed product figures for readers of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub price_range: Option<PriceRange>,
    pub total_inventory: u64,
    pub availability_status: AvailabilityStatus,
    pub is_available: bool,
    pub variant_count: usize,
}

/// Product aggregate root.
///
/// Owns its variants and images. Variants are unique by id and by SKU and
/// all share one currency. Images are kept ordered by position with no gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "ProductSnapshot", try_from = "ProductSnapshot")]
pub struct Product {
    id: ProductId,
    title: String,
    handle: String,
    description: String,
    status: ProductStatus,
    category_ids: BTreeSet<ProductCategoryId>,
    tags: BTreeSet<String>,
    vendor: Option<String>,
    product_type: Option<String>,
    images: Vec<ProductImage>,
    seo: ProductSeo,
    metafields: BTreeMap<String, String>,
    variants: Vec<ProductVariant>,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: EventLog<ProductEvent>,
}

impl AggregateRoot for Product {
    type Event = ProductEvent;

    fn aggregate_type() -> &'static str {
        "Product"
    }

    fn aggregate_id(&self) -> AggregateId {
        self.id.into()
    }

    fn uncommitted_events(&self) -> Vec<ProductEvent> {
        let mut events = self.events.events().to_vec();
        for variant in &self.variants {
            events.extend_from_slice(variant.pending_events());
        }
        events
    }

    fn mark_events_as_committed(&mut self) {
        self.events.clear();
        for variant in &mut self.variants {
            variant.clear_events();
        }
    }
}

// Factory
impl Product {
    /// Creates a draft product with no variants.
    pub fn create(
        title: impl Into<String>,
        handle: impl Into<String>,
        description: impl Into<String>,
        category_ids: impl IntoIterator<Item = ProductCategoryId>,
    ) -> DomainResult<Self> {
        let title = validate_title(title)?;
        let handle = validate_handle(handle)?;
        let description = validate_description(description)?;
        let category_ids: BTreeSet<_> = category_ids.into_iter().collect();

        let now = Utc::now();
        let mut product = Self {
            id: ProductId::new(),
            title,
            handle,
            description,
            status: ProductStatus::Draft,
            category_ids,
            tags: BTreeSet::new(),
            vendor: None,
            product_type: None,
            images: Vec::new(),
            seo: ProductSeo::default(),
            metafields: BTreeMap::new(),
            variants: Vec::new(),
            published_at: None,
            created_at: now,
            updated_at: now,
            events: EventLog::new(),
        };
        product.events.record(ProductEvent::ProductCreated(ProductCreatedData {
            product_id: product.id,
            title: product.title.clone(),
            handle: product.handle.clone(),
            category_ids: product.category_ids.iter().copied().collect(),
            occurred_at: now,
        }));
        Ok(product)
    }
}

// Query methods
impl Product {
    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn category_ids(&self) -> &BTreeSet<ProductCategoryId> {
        &self.category_ids
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    pub fn product_type(&self) -> Option<&str> {
        self.product_type.as_deref()
    }

    /// Returns the images ordered by position.
    pub fn images(&self) -> &[ProductImage] {
        &self.images
    }

    pub fn seo(&self) -> &ProductSeo {
        &self.seo
    }

    pub fn metafields(&self) -> &BTreeMap<String, String> {
        &self.metafields
    }

    pub fn variants(&self) -> &[ProductVariant] {
        &self.variants
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn variant(&self, variant_id: ProductVariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id() == variant_id)
    }

    pub fn variant_by_sku(&self, sku: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.sku() == sku)
    }

    /// Returns the currency shared by all variants, if there are any.
    pub fn currency(&self) -> Option<Currency> {
        self.variants.first().map(|v| v.price().currency())
    }

    /// Returns the lowest and highest variant price, or None without variants.
    pub fn price_range(&self) -> Option<PriceRange> {
        let first = self.variants.first()?.price();
        let (min, max) = self.variants.iter().map(ProductVariant::price).fold(
            (first, first),
            |(min, max), price| {
                (
                    if price.amount() < min.amount() { price } else { min },
                    if price.amount() > max.amount() { price } else { max },
                )
            },
        );
        Some(PriceRange { min, max })
    }

    /// Returns the stock on hand across all variants.
    pub fn total_inventory(&self) -> u64 {
        self.variants
            .iter()
            .map(|v| u64::from(v.inventory_quantity()))
            .sum()
    }

    /// Returns true if the product is published and a variant can sell one unit.
    pub fn is_available(&self) -> bool {
        self.status.is_active() && self.variants.iter().any(|v| v.is_available(1))
    }

    pub fn availability_status(&self) -> AvailabilityStatus {
        if !self.status.is_active() {
            AvailabilityStatus::Discontinued
        } else if !self.variants.iter().any(|v| v.is_available(1)) {
            AvailabilityStatus::OutOfStock
        } else {
            AvailabilityStatus::InStock
        }
    }

    /// Returns the image at position zero, falling back to the first image.
    pub fn featured_image(&self) -> Option<&ProductImage> {
        self.images
            .iter()
            .find(|image| image.position() == 0)
            .or_else(|| self.images.first())
    }

    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            price_range: self.price_range(),
            total_inventory: self.total_inventory(),
            availability_status: self.availability_status(),
            is_available: self.is_available(),
            variant_count: self.variants.len(),
        }
    }
}

// Catalog fields
impl Product {
    /// Changes title and description. Unchanged values record nothing.
    pub fn update_basic_info(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> DomainResult<()> {
        let title = validate_title(title)?;
        let description = validate_description(description)?;

        let mut changed = Vec::new();
        if title != self.title {
            self.title = title;
            changed.push("title");
        }
        if description != self.description {
            self.description = description;
            changed.push("description");
        }
        self.record_update(&changed);
        Ok(())
    }

    pub fn update_handle(&mut self, handle: impl Into<String>) -> DomainResult<()> {
        let handle = validate_handle(handle)?;
        if handle != self.handle {
            self.handle = handle;
            self.record_update(&["handle"]);
        }
        Ok(())
    }

    pub fn update_seo(&mut self, seo: ProductSeo) -> DomainResult<()> {
        let seo = seo.validated()?;
        if seo != self.seo {
            self.seo = seo;
            self.record_update(&["seo"]);
        }
        Ok(())
    }

    /// Sets or clears the vendor.
    pub fn update_vendor(&mut self, vendor: Option<String>) -> DomainResult<()> {
        let vendor = optional_text("vendor", vendor)?;
        if vendor != self.vendor {
            self.vendor = vendor;
            self.record_update(&["vendor"]);
        }
        Ok(())
    }

    /// Sets or clears the product type.
    pub fn update_product_type(&mut self, product_type: Option<String>) -> DomainResult<()> {
        let product_type = optional_text("product_type", product_type)?;
        if product_type != self.product_type {
            self.product_type = product_type;
            self.record_update(&["product_type"]);
        }
        Ok(())
    }

    pub fn set_metafield(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> DomainResult<()> {
        let key = required_text("metafield key", key)?;
        let value = value.into();
        if self.metafields.get(&key) != Some(&value) {
            self.metafields.insert(key, value);
            self.record_update(&["metafields"]);
        }
        Ok(())
    }

    pub fn remove_metafield(&mut self, key: &str) -> DomainResult<()> {
        if self.metafields.remove(key.trim()).is_none() {
            return Err(DomainError::validation(
                "metafield key",
                format!("no metafield named {key:?}"),
            ));
        }
        self.record_update(&["metafields"]);
        Ok(())
    }

    /// Adds a tag. Tags are lowercased; adding a present tag does nothing.
    pub fn add_tag(&mut self, tag: &str) -> DomainResult<()> {
        let tag = normalize_tag(tag)?;
        if self.tags.insert(tag) {
            self.record_update(&["tags"]);
        }
        Ok(())
    }

    pub fn remove_tag(&mut self, tag: &str) -> DomainResult<()> {
        let tag = normalize_tag(tag)?;
        if self.tags.remove(&tag) {
            self.record_update(&["tags"]);
        }
        Ok(())
    }

    pub fn assign_to_category(&mut self, category_id: ProductCategoryId) -> DomainResult<()> {
        if self.category_ids.insert(category_id) {
            self.record_update(&["category_ids"]);
        }
        Ok(())
    }

    pub fn remove_from_category(&mut self, category_id: ProductCategoryId) -> DomainResult<()> {
        if self.category_ids.remove(&category_id) {
            self.record_update(&["category_ids"]);
        }
        Ok(())
    }

    /// Inserts an image at its position, shifting later images back.
    ///
    /// A position past the end appends. Positions are renumbered to stay
    /// contiguous.
    pub fn add_image(&mut self, image: ProductImage) -> DomainResult<()> {
        if self.images.iter().any(|i| i.url() == image.url()) {
            return Err(BusinessRuleViolation::DuplicateImage(image.url().to_string()).into());
        }
        let index = (image.position() as usize).min(self.images.len());
        self.images.insert(index, image);
        self.reindex_images();
        self.record_update(&["images"]);
        Ok(())
    }

    pub fn remove_image(&mut self, url: &str) -> DomainResult<()> {
        let index = self
            .images
            .iter()
            .position(|i| i.url() == url)
            .ok_or_else(|| DomainError::validation("url", format!("no image at {url}")))?;
        self.images.remove(index);
        self.reindex_images();
        self.record_update(&["images"]);
        Ok(())
    }

    fn reindex_images(&mut self) {
        for (position, image) in (0u32..).zip(self.images.iter_mut()) {
            image.set_position(position);
        }
    }

    fn record_update(&mut self, changed_fields: &[&str]) {
        if changed_fields.is_empty() {
            return;
        }
        let now = Utc::now();
        self.events.record(ProductEvent::ProductUpdated(ProductUpdatedData {
            product_id: self.id,
            changed_fields: changed_fields.iter().map(|f| f.to_string()).collect(),
            occurred_at: now,
        }));
        self.updated_at = now;
    }
}

// Lifecycle
impl Product {
    /// Publishes the product. It needs at least one variant.
    pub fn publish(&mut self) -> DomainResult<()> {
        if self.status.is_active() {
            return Err(self.invalid_status("publish"));
        }
        if self.variants.is_empty() {
            return Err(BusinessRuleViolation::NoVariants.into());
        }

        let now = Utc::now();
        self.events
            .record(ProductEvent::ProductPublished(ProductPublishedData {
                product_id: self.id,
                previous_status: self.status,
                published_at: now,
                occurred_at: now,
            }));
        self.status = ProductStatus::Active;
        self.published_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn unpublish(&mut self) -> DomainResult<()> {
        if !self.status.is_active() {
            return Err(self.invalid_status("unpublish"));
        }
        let now = Utc::now();
        self.events
            .record(ProductEvent::ProductUnpublished(ProductUnpublishedData {
                product_id: self.id,
                occurred_at: now,
            }));
        self.status = ProductStatus::Inactive;
        self.updated_at = now;
        Ok(())
    }

    pub fn archive(&mut self) -> DomainResult<()> {
        if self.status == ProductStatus::Archived {
            return Err(self.invalid_status("archive"));
        }
        let now = Utc::now();
        self.events
            .record(ProductEvent::ProductArchived(ProductArchivedData {
                product_id: self.id,
                previous_status: self.status,
                occurred_at: now,
            }));
        self.status = ProductStatus::Archived;
        self.updated_at = now;
        Ok(())
    }

    fn invalid_status(&self, action: &'static str) -> DomainError {
        BusinessRuleViolation::InvalidStatus {
            action,
            status: self.status.as_str(),
        }
        .into()
    }
}

// Variant management
impl Product {
    /// Adds a variant built for this product.
    pub fn add_variant(&mut self, variant: ProductVariant) -> DomainResult<()> {
        if variant.product_id() != self.id {
            return Err(DomainError::validation(
                "product_id",
                format!(
                    "variant belongs to product {}, not {}",
                    variant.product_id(),
                    self.id
                ),
            ));
        }
        if self.variant(variant.id()).is_some() {
            return Err(BusinessRuleViolation::DuplicateVariant(variant.id()).into());
        }
        if self.variant_by_sku(variant.sku()).is_some() {
            return Err(BusinessRuleViolation::DuplicateSku(variant.sku().to_string()).into());
        }
        if let Some(first) = self.variants.first() {
            first.price().ensure_same_currency(&variant.price())?;
        }

        let now = Utc::now();
        self.events
            .record(ProductEvent::ProductVariantAdded(ProductVariantAddedData {
                product_id: self.id,
                variant_id: variant.id(),
                sku: variant.sku().to_string(),
                price: variant.price(),
                inventory_quantity: variant.inventory_quantity(),
                occurred_at: now,
            }));
        self.variants.push(variant);
        self.updated_at = now;
        Ok(())
    }

    /// Builds a variant from `details` and adds it. Returns the new id.
    pub fn create_variant(&mut self, details: NewProductVariant) -> DomainResult<ProductVariantId> {
        let variant = ProductVariant::create(self.id, details)?;
        let variant_id = variant.id();
        self.add_variant(variant)?;
        Ok(variant_id)
    }

    /// Removes a variant. The last variant cannot be removed.
    pub fn remove_variant(&mut self, variant_id: ProductVariantId) -> DomainResult<()> {
        let index = self.variant_index(variant_id)?;
        if self.variants.len() == 1 {
            return Err(BusinessRuleViolation::LastVariant.into());
        }

        let mut variant = self.variants.remove(index);
        self.events.absorb(variant.take_events());

        let now = Utc::now();
        self.events
            .record(ProductEvent::ProductVariantRemoved(ProductVariantRemovedData {
                product_id: self.id,
                variant_id,
                sku: variant.sku().to_string(),
                occurred_at: now,
            }));
        self.updated_at = now;
        Ok(())
    }

    /// Applies a partial update to a variant.
    ///
    /// Either every field in the update is applied or none is.
    pub fn update_variant(
        &mut self,
        variant_id: ProductVariantId,
        update: VariantUpdate,
    ) -> DomainResult<()> {
        let index = self.variant_index(variant_id)?;

        if let Some(sku) = &update.sku {
            let sku = sku.trim();
            if self
                .variants
                .iter()
                .any(|v| v.id() != variant_id && v.sku() == sku)
            {
                return Err(BusinessRuleViolation::DuplicateSku(sku.to_string()).into());
            }
        }

        let mut updated = self.variants[index].clone();
        updated.apply_update(update)?;
        self.variants[index] = updated;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn update_variant_price(
        &mut self,
        variant_id: ProductVariantId,
        price: Money,
        compare_at_price: Option<Money>,
    ) -> DomainResult<()> {
        let index = self.variant_index(variant_id)?;
        self.variants[index].update_price(price, compare_at_price)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn update_variant_inventory(
        &mut self,
        variant_id: ProductVariantId,
        quantity: u32,
    ) -> DomainResult<()> {
        let index = self.variant_index(variant_id)?;
        self.variants[index].update_inventory(quantity)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Takes stock out of a variant, e.g. when an order is placed.
    pub fn reduce_variant_inventory(
        &mut self,
        variant_id: ProductVariantId,
        quantity: u32,
    ) -> DomainResult<()> {
        let index = self.variant_index(variant_id)?;
        self.variants[index].reduce_inventory(quantity)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn variant_index(&self, variant_id: ProductVariantId) -> DomainResult<usize> {
        self.variants
            .iter()
            .position(|v| v.id() == variant_id)
            .ok_or_else(|| {
                DomainError::validation("variant_id", format!("no variant {variant_id} on product"))
            })
    }
}

/// Serialized form of a product, with a computed summary for readers.
#[derive(Serialize, Deserialize)]
struct ProductSnapshot {
    id: ProductId,
    title: String,
    handle: String,
    description: String,
    status: ProductStatus,
    category_ids: BTreeSet<ProductCategoryId>,
    tags: BTreeSet<String>,
    vendor: Option<String>,
    product_type: Option<String>,
    images: Vec<ProductImage>,
    #[serde(default)]
    seo: ProductSeo,
    #[serde(default)]
    metafields: BTreeMap<String, String>,
    variants: Vec<ProductVariant>,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_deserializing)]
    summary: Option<ProductSummary>,
}

impl From<Product> for ProductSnapshot {
    fn from(product: Product) -> Self {
        let summary = Some(product.summary());
        Self {
            id: product.id,
            title: product.title,
            handle: product.handle,
            description: product.description,
            status: product.status,
            category_ids: product.category_ids,
            tags: product.tags,
            vendor: product.vendor,
            product_type: product.product_type,
            images: product.images,
            seo: product.seo,
            metafields: product.metafields,
            variants: product.variants,
            published_at: product.published_at,
            created_at: product.created_at,
            updated_at: product.updated_at,
            summary,
        }
    }
}

impl TryFrom<ProductSnapshot> for Product {
    type Error = DomainError;

    fn try_from(snapshot: ProductSnapshot) -> Result<Self, Self::Error> {
        let mut variants: Vec<ProductVariant> = Vec::with_capacity(snapshot.variants.len());
        for variant in snapshot.variants {
            let variant = variant.validated()?;
            if variant.product_id() != snapshot.id {
                return Err(ValidationError::new(
                    "variants",
                    format!("variant {} belongs to product {}", variant.id(), variant.product_id()),
                )
                .into());
            }
            if variants.iter().any(|v| v.id() == variant.id()) {
                return Err(BusinessRuleViolation::DuplicateVariant(variant.id()).into());
            }
            if variants.iter().any(|v| v.sku() == variant.sku()) {
                return Err(BusinessRuleViolation::DuplicateSku(variant.sku().to_string()).into());
            }
            if let Some(first) = variants.first() {
                first.price().ensure_same_currency(&variant.price())?;
            }
            variants.push(variant);
        }

        let mut images: Vec<ProductImage> = Vec::with_capacity(snapshot.images.len());
        for image in snapshot.images {
            let image = image.validated()?;
            if images.iter().any(|i| i.url() == image.url()) {
                return Err(BusinessRuleViolation::DuplicateImage(image.url().to_string()).into());
            }
            images.push(image);
        }
        images.sort_by_key(ProductImage::position);
        if images
            .iter()
            .zip(0u32..)
            .any(|(image, position)| image.position() != position)
        {
            return Err(ValidationError::new("images", "positions must run from 0 without gaps").into());
        }

        let tags = snapshot
            .tags
            .iter()
            .map(|tag| normalize_tag(tag))
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Self {
            id: snapshot.id,
            title: validate_title(snapshot.title)?,
            handle: validate_handle(snapshot.handle)?,
            description: validate_description(snapshot.description)?,
            status: snapshot.status,
            category_ids: snapshot.category_ids,
            tags,
            vendor: optional_text("vendor", snapshot.vendor)?,
            product_type: optional_text("product_type", snapshot.product_type)?,
            images,
            seo: snapshot.seo.validated()?,
            metafields: snapshot.metafields,
            variants,
            published_at: snapshot.published_at,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            events: EventLog::new(),
        })
    }
}
