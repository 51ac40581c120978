//! Product service providing an async API over the product aggregate.

use common::{ProductCategoryId, ProductId, ProductVariantId};
use store::AggregateStore;

use crate::command::{CommandHandler, CommandResult};
use crate::config::CommerceConfig;
use crate::error::ServiceError;
use crate::money::Money;

use super::{NewProductVariant, Product, ProductImage, ProductSeo, VariantUpdate};

type ProductResult = Result<CommandResult<Product>, ServiceError>;

/// Service for managing the product catalog.
pub struct ProductService<S: AggregateStore> {
    handler: CommandHandler<S, Product>,
}

impl<S: AggregateStore> ProductService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, &CommerceConfig::default())
    }

    pub fn with_config(store: S, config: &CommerceConfig) -> Self {
        Self {
            handler: CommandHandler::with_config(store, config),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Product> {
        &self.handler
    }

    /// Creates a draft product.
    #[tracing::instrument(skip(self, description, category_ids))]
    pub async fn create_product(
        &self,
        title: &str,
        handle: &str,
        description: &str,
        category_ids: Vec<ProductCategoryId>,
    ) -> ProductResult {
        let product = Product::create(title, handle, description, category_ids)?;
        self.handler.create(product).await
    }

    /// Gets a product by ID.
    pub async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, ServiceError> {
        self.handler.find(product_id.into()).await
    }

    #[tracing::instrument(skip(self, description))]
    pub async fn update_basic_info(
        &self,
        product_id: ProductId,
        title: &str,
        description: &str,
    ) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| {
                product.update_basic_info(title, description)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_handle(&self, product_id: ProductId, handle: &str) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| product.update_handle(handle))
            .await
    }

    #[tracing::instrument(skip(self, seo))]
    pub async fn update_seo(&self, product_id: ProductId, seo: ProductSeo) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| product.update_seo(seo.clone()))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn publish(&self, product_id: ProductId) -> ProductResult {
        self.handler.execute(product_id.into(), Product::publish).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn unpublish(&self, product_id: ProductId) -> ProductResult {
        self.handler
            .execute(product_id.into(), Product::unpublish)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn archive(&self, product_id: ProductId) -> ProductResult {
        self.handler.execute(product_id.into(), Product::archive).await
    }

    /// Adds a variant built from `details`.
    #[tracing::instrument(skip(self, details), fields(sku = %details.sku))]
    pub async fn add_variant(
        &self,
        product_id: ProductId,
        details: NewProductVariant,
    ) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| {
                product.create_variant(details.clone()).map(|_| ())
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_variant(
        &self,
        product_id: ProductId,
        variant_id: ProductVariantId,
    ) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| product.remove_variant(variant_id))
            .await
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_variant(
        &self,
        product_id: ProductId,
        variant_id: ProductVariantId,
        update: VariantUpdate,
    ) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| {
                product.update_variant(variant_id, update.clone())
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_variant_price(
        &self,
        product_id: ProductId,
        variant_id: ProductVariantId,
        price: Money,
        compare_at_price: Option<Money>,
    ) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| {
                product.update_variant_price(variant_id, price, compare_at_price)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_variant_inventory(
        &self,
        product_id: ProductId,
        variant_id: ProductVariantId,
        quantity: u32,
    ) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| {
                product.update_variant_inventory(variant_id, quantity)
            })
            .await
    }

    /// Takes stock out of a variant.
    #[tracing::instrument(skip(self))]
    pub async fn reduce_variant_inventory(
        &self,
        product_id: ProductId,
        variant_id: ProductVariantId,
        quantity: u32,
    ) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| {
                product.reduce_variant_inventory(variant_id, quantity)
            })
            .await
    }

    #[tracing::instrument(skip(self, image), fields(url = image.url()))]
    pub async fn add_image(&self, product_id: ProductId, image: ProductImage) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| product.add_image(image.clone()))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_image(&self, product_id: ProductId, url: &str) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| product.remove_image(url))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_tag(&self, product_id: ProductId, tag: &str) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| product.add_tag(tag))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_tag(&self, product_id: ProductId, tag: &str) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| product.remove_tag(tag))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn assign_to_category(
        &self,
        product_id: ProductId,
        category_id: ProductCategoryId,
    ) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| {
                product.assign_to_category(category_id)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_from_category(
        &self,
        product_id: ProductId,
        category_id: ProductCategoryId,
    ) -> ProductResult {
        self.handler
            .execute(product_id.into(), |product| {
                product.remove_from_category(category_id)
            })
            .await
    }
}
