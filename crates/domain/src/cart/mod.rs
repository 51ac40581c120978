//! Cart aggregate and related types.

mod aggregate;
mod discount;
mod events;
mod item;
mod service;
mod shipping;
mod state;

pub use aggregate::{Cart, CartOwner, CartTotals, DEFAULT_CART_TTL_DAYS};
pub use discount::{CartDiscount, DiscountValue};
pub use events::{
    CartAbandonedData, CartAssignedToUserData, CartClearedData, CartCompletedData,
    CartCreatedData, CartDiscountAppliedData, CartDiscountRemovedData, CartEvent,
    CartExpiredData, CartItemAddedData, CartItemPriceChangedData, CartItemQuantityChangedData,
    CartItemRemovedData, ClearedItem,
};
pub use item::{CartItem, MAX_ITEM_QUANTITY, NewCartItem};
pub use service::CartService;
pub use shipping::ShippingInformation;
pub use state::CartStatus;
