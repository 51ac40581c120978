//! Product aggregate and related types.

mod aggregate;
mod events;
mod service;
mod state;
mod value_objects;
mod variant;

pub use aggregate::{DESCRIPTION_MAX_CHARS, PriceRange, Product, ProductSummary, TITLE_MAX_CHARS};
pub use events::{
    ProductArchivedData, ProductCreatedData, ProductEvent, ProductInventoryChangedData,
    ProductPublishedData, ProductUnpublishedData, ProductUpdatedData, ProductVariantAddedData,
    ProductVariantPriceChangedData, ProductVariantRemovedData, ProductVariantUpdatedData,
};
pub use service::ProductService;
pub use state::{AvailabilityStatus, ProductStatus};
pub use value_objects::{
    ProductDimensions, ProductImage, ProductSeo, SEO_DESCRIPTION_MAX_CHARS, SEO_TITLE_MAX_CHARS,
};
pub use variant::{NewProductVariant, ProductVariant, VariantUpdate};
