//! Cart service providing an async API over the cart aggregate.

use common::{CartId, CartItemId, UserId};
use store::AggregateStore;

use crate::command::{CommandHandler, CommandResult};
use crate::config::CommerceConfig;
use crate::error::ServiceError;
use crate::money::Money;

use super::{Cart, CartDiscount, CartOwner, NewCartItem, ShippingInformation};

type CartResult = Result<CommandResult<Cart>, ServiceError>;

/// Service for managing carts.
///
/// Wraps the command handler so every cart operation is one
/// load-mutate-save cycle.
pub struct CartService<S: AggregateStore> {
    handler: CommandHandler<S, Cart>,
    config: CommerceConfig,
}

impl<S: AggregateStore> CartService<S> {
    /// Creates a new cart service with default settings.
    pub fn new(store: S) -> Self {
        Self::with_config(store, CommerceConfig::default())
    }

    pub fn with_config(store: S, config: CommerceConfig) -> Self {
        Self {
            handler: CommandHandler::with_config(store, &config),
            config,
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Cart> {
        &self.handler
    }

    pub fn config(&self) -> &CommerceConfig {
        &self.config
    }

    /// Creates a cart for an anonymous session in the default currency.
    #[tracing::instrument(skip(self))]
    pub async fn create_guest_cart(&self, session_id: &str) -> CartResult {
        self.create(CartOwner::guest(session_id)).await
    }

    /// Creates a cart for a signed-in user in the default currency.
    #[tracing::instrument(skip(self))]
    pub async fn create_user_cart(&self, user_id: UserId) -> CartResult {
        self.create(CartOwner::user(user_id)).await
    }

    async fn create(&self, owner: CartOwner) -> CartResult {
        let cart = Cart::create(owner, self.config.default_currency, self.config.cart_ttl()?)?;
        self.handler.create(cart).await
    }

    /// Gets a cart by ID.
    pub async fn get_cart(&self, cart_id: CartId) -> Result<Option<Cart>, ServiceError> {
        self.handler.find(cart_id.into()).await
    }

    #[tracing::instrument(skip(self, item), fields(sku = %item.sku, quantity = item.quantity))]
    pub async fn add_item(&self, cart_id: CartId, item: NewCartItem) -> CartResult {
        self.handler
            .execute(cart_id.into(), |cart| cart.add_item(item.clone()).map(|_| ()))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, cart_id: CartId, item_id: CartItemId) -> CartResult {
        self.handler
            .execute(cart_id.into(), |cart| cart.remove_item(item_id))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> CartResult {
        self.handler
            .execute(cart_id.into(), |cart| {
                cart.update_item_quantity(item_id, quantity)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_item_price(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        unit_price: Money,
        compare_at_price: Option<Money>,
    ) -> CartResult {
        self.handler
            .execute(cart_id.into(), |cart| {
                cart.update_item_price(item_id, unit_price, compare_at_price)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear_items(&self, cart_id: CartId) -> CartResult {
        self.handler
            .execute(cart_id.into(), Cart::clear_items)
            .await
    }

    #[tracing::instrument(skip(self, discount), fields(code = discount.code()))]
    pub async fn apply_discount(&self, cart_id: CartId, discount: CartDiscount) -> CartResult {
        self.handler
            .execute(cart_id.into(), |cart| cart.apply_discount(discount.clone()))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_discount(&self, cart_id: CartId, code: &str) -> CartResult {
        self.handler
            .execute(cart_id.into(), |cart| cart.remove_discount(code))
            .await
    }

    #[tracing::instrument(skip(self, shipping), fields(method = shipping.method()))]
    pub async fn update_shipping(
        &self,
        cart_id: CartId,
        shipping: ShippingInformation,
    ) -> CartResult {
        self.handler
            .execute(cart_id.into(), |cart| cart.update_shipping(shipping.clone()))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_shipping(&self, cart_id: CartId) -> CartResult {
        self.handler
            .execute(cart_id.into(), Cart::remove_shipping)
            .await
    }

    /// Hands a guest cart over to a signed-in user.
    #[tracing::instrument(skip(self))]
    pub async fn assign_to_user(&self, cart_id: CartId, user_id: UserId) -> CartResult {
        self.handler
            .execute(cart_id.into(), |cart| cart.assign_to_user(user_id))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn abandon(&self, cart_id: CartId) -> CartResult {
        self.handler.execute(cart_id.into(), Cart::abandon).await
    }

    /// Checks a cart out.
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, cart_id: CartId) -> CartResult {
        self.handler.execute(cart_id.into(), Cart::complete).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn expire(&self, cart_id: CartId) -> CartResult {
        self.handler.execute(cart_id.into(), Cart::expire).await
    }
}
