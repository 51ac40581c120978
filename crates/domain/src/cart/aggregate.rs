//! Cart aggregate implementation.

use chrono::{DateTime, Duration, Utc};
use common::{AggregateId, CartId, CartItemId, ProductId, ProductVariantId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateRoot, EventLog};
use crate::error::{BusinessRuleViolation, DomainError, DomainResult, ValidationError};
use crate::money::{Currency, Money};
use crate::validation::required_text;

use super::{
    CartDiscount, CartEvent, CartItem, CartStatus, NewCartItem, ShippingInformation,
    discount::normalize_code,
    events::{
        CartAbandonedData, CartAssignedToUserData, CartClearedData, CartCompletedData,
        CartCreatedData, CartDiscountAppliedData, CartDiscountRemovedData, CartExpiredData,
        CartItemAddedData, CartItemRemovedData, ClearedItem,
    },
    item::{MAX_ITEM_QUANTITY, validate_quantity},
};

/// Lifetime of a cart created without an explicit TTL.
pub const DEFAULT_CART_TTL_DAYS: i64 = 30;

/// Who a cart belongs to: an anonymous session or a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartOwner {
    Guest { session_id: String },
    User { user_id: UserId },
}

impl CartOwner {
    pub fn guest(session_id: impl Into<String>) -> Self {
        CartOwner::Guest {
            session_id: session_id.into(),
        }
    }

    pub fn user(user_id: UserId) -> Self {
        CartOwner::User { user_id }
    }

    fn validated(self) -> DomainResult<Self> {
        Ok(match self {
            CartOwner::Guest { session_id } => CartOwner::Guest {
                session_id: required_text("session_id", session_id)?,
            },
            user => user,
        })
    }
}

/// Computed cart amounts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Money,
    pub total_discounts: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub total_items: u32,
    pub unique_items: usize,
}

/// Cart aggregate root.
///
/// Owns its items, discounts, and shipping choice. Every mutation goes
/// through a method here and requires the cart to be active.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "CartSnapshot", try_from = "CartSnapshot")]
pub struct Cart {
    id: CartId,
    owner: CartOwner,
    currency: Currency,
    status: CartStatus,

    /// Lines in insertion order, unique by product and variant.
    items: Vec<CartItem>,

    /// Applied discounts, unique by code.
    discounts: Vec<CartDiscount>,
    shipping: Option<ShippingInformation>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    events: EventLog<CartEvent>,
}

impl AggregateRoot for Cart {
    type Event = CartEvent;

    fn aggregate_type() -> &'static str {
        "Cart"
    }

    fn aggregate_id(&self) -> AggregateId {
        self.id.into()
    }

    fn uncommitted_events(&self) -> Vec<CartEvent> {
        let mut events = self.events.events().to_vec();
        for item in &self.items {
            events.extend_from_slice(item.pending_events());
        }
        events
    }

    fn mark_events_as_committed(&mut self) {
        self.events.clear();
        for item in &mut self.items {
            item.clear_events();
        }
    }
}

// Factories
impl Cart {
    /// Creates an empty active cart that expires after `ttl`.
    pub fn create(owner: CartOwner, currency: Currency, ttl: Duration) -> DomainResult<Self> {
        if ttl <= Duration::zero() {
            return Err(ValidationError::new("ttl", "must be positive").into());
        }
        let owner = owner.validated()?;

        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| ValidationError::new("ttl", "expiry is out of range"))?;
        let mut cart = Self {
            id: CartId::new(),
            owner,
            currency,
            status: CartStatus::Active,
            items: Vec::new(),
            discounts: Vec::new(),
            shipping: None,
            created_at: now,
            updated_at: now,
            expires_at,
            events: EventLog::new(),
        };
        cart.events.record(CartEvent::CartCreated(CartCreatedData {
            cart_id: cart.id,
            user_id: cart.user_id(),
            session_id: cart.session_id().map(str::to_string),
            currency,
            expires_at: cart.expires_at,
            occurred_at: now,
        }));
        Ok(cart)
    }

    /// Creates a cart for an anonymous session.
    pub fn create_guest(session_id: impl Into<String>, currency: Currency) -> DomainResult<Self> {
        Self::create(
            CartOwner::guest(session_id),
            currency,
            Duration::days(DEFAULT_CART_TTL_DAYS),
        )
    }

    /// Creates a cart for a signed-in user.
    pub fn create_for_user(user_id: UserId, currency: Currency) -> DomainResult<Self> {
        Self::create(
            CartOwner::user(user_id),
            currency,
            Duration::days(DEFAULT_CART_TTL_DAYS),
        )
    }
}

// Query methods
impl Cart {
    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn owner(&self) -> &CartOwner {
        &self.owner
    }

    /// Returns the user the cart belongs to, if any.
    pub fn user_id(&self) -> Option<UserId> {
        match &self.owner {
            CartOwner::User { user_id } => Some(*user_id),
            CartOwner::Guest { .. } => None,
        }
    }

    /// Returns the guest session, if the cart has no user yet.
    pub fn session_id(&self) -> Option<&str> {
        match &self.owner {
            CartOwner::Guest { session_id } => Some(session_id),
            CartOwner::User { .. } => None,
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id() == item_id)
    }

    /// Returns the line holding the given product variant.
    pub fn find_item(
        &self,
        product_id: ProductId,
        variant_id: ProductVariantId,
    ) -> Option<&CartItem> {
        self.items
            .iter()
            .find(|item| item.is_same_product(product_id, variant_id))
    }

    pub fn discounts(&self) -> &[CartDiscount] {
        &self.discounts
    }

    pub fn shipping(&self) -> Option<&ShippingInformation> {
        self.shipping.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true once the expiry time has passed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Returns true if the cart is active and has at least one line.
    pub fn can_checkout(&self) -> bool {
        self.status.is_active() && !self.is_empty()
    }

    /// Returns the sum of all line quantities.
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(CartItem::quantity).sum()
    }

    /// Returns the number of lines.
    pub fn total_unique_items(&self) -> usize {
        self.items.len()
    }
}

// Calculations
impl Cart {
    /// Returns the sum of all line totals.
    ///
    /// Item mutations reject any change that would push this sum out of the
    /// `i64` range.
    pub fn subtotal(&self) -> Money {
        let amount = self
            .items
            .iter()
            .fold(0i64, |sum, item| sum.saturating_add(item.total_price().amount()));
        Money::new(amount, self.currency)
    }

    /// Returns the sum of every discount, each computed against the subtotal.
    pub fn total_discounts(&self) -> Money {
        let subtotal = self.subtotal();
        // Discount currencies are checked on apply and on rehydration.
        let amount = self.discounts.iter().fold(0i64, |sum, discount| {
            sum.saturating_add(discount.amount_off(subtotal).amount())
        });
        Money::new(amount, self.currency)
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping
            .as_ref()
            .map_or(Money::zero(self.currency), ShippingInformation::cost)
    }

    /// Returns subtotal minus discounts plus shipping, never below zero.
    pub fn total(&self) -> Money {
        let amount = self
            .subtotal()
            .amount()
            .saturating_sub(self.total_discounts().amount())
            .saturating_add(self.shipping_cost().amount());
        Money::new(amount, self.currency).clamp_non_negative()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals {
            subtotal: self.subtotal(),
            total_discounts: self.total_discounts(),
            shipping_cost: self.shipping_cost(),
            total: self.total(),
            total_items: self.total_items(),
            unique_items: self.total_unique_items(),
        }
    }
}

// Item management
impl Cart {
    /// Adds a product variant to the cart.
    ///
    /// If the variant is already in the cart the quantities are merged and
    /// the existing line records the change. Returns the id of the line.
    pub fn add_item(&mut self, details: NewCartItem) -> DomainResult<CartItemId> {
        self.ensure_active("add item")?;
        self.ensure_currency(details.unit_price)?;

        if let Some(index) = self
            .items
            .iter()
            .position(|item| item.is_same_product(details.product_id, details.variant_id))
        {
            let added = validate_quantity(details.quantity)?;
            let requested = self.items[index].quantity() + added;
            if requested > MAX_ITEM_QUANTITY {
                return Err(BusinessRuleViolation::QuantityLimitExceeded {
                    requested,
                    max: MAX_ITEM_QUANTITY,
                }
                .into());
            }
            let mut item = self.items[index].clone();
            item.update_quantity(requested)?;
            let item_id = item.id();
            self.replace_item(index, item)?;
            return Ok(item_id);
        }

        let item = CartItem::create(self.id, details)?;
        self.ensure_subtotal_fits(None, item.total_price())?;
        let now = Utc::now();
        self.events.record(CartEvent::CartItemAdded(CartItemAddedData {
            cart_id: self.id,
            item_id: item.id(),
            product_id: item.product_id(),
            variant_id: item.variant_id(),
            sku: item.sku().to_string(),
            quantity: item.quantity(),
            unit_price: item.unit_price(),
            occurred_at: now,
        }));
        let item_id = item.id();
        self.items.push(item);
        self.updated_at = now;
        Ok(item_id)
    }

    /// Removes a line from the cart.
    pub fn remove_item(&mut self, item_id: CartItemId) -> DomainResult<()> {
        self.ensure_active("remove item")?;
        let index = self.item_index(item_id)?;

        let mut item = self.items.remove(index);
        self.events.absorb(item.take_events());

        let now = Utc::now();
        self.events.record(CartEvent::CartItemRemoved(CartItemRemovedData {
            cart_id: self.id,
            item_id: item.id(),
            product_id: item.product_id(),
            variant_id: item.variant_id(),
            quantity: item.quantity(),
            occurred_at: now,
        }));
        self.updated_at = now;
        Ok(())
    }

    /// Sets a line's quantity. A quantity of zero removes the line.
    pub fn update_item_quantity(&mut self, item_id: CartItemId, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return self.remove_item(item_id);
        }
        self.ensure_active("update item quantity")?;
        let index = self.item_index(item_id)?;
        let mut item = self.items[index].clone();
        item.update_quantity(quantity)?;
        self.replace_item(index, item)
    }

    /// Reprices a line. Omitting `compare_at_price` clears it.
    pub fn update_item_price(
        &mut self,
        item_id: CartItemId,
        unit_price: Money,
        compare_at_price: Option<Money>,
    ) -> DomainResult<()> {
        self.ensure_active("update item price")?;
        self.ensure_currency(unit_price)?;
        let index = self.item_index(item_id)?;
        let mut item = self.items[index].clone();
        item.update_price(unit_price, compare_at_price)?;
        self.replace_item(index, item)
    }

    /// Removes every line at once.
    ///
    /// Does nothing when the cart is already empty.
    pub fn clear_items(&mut self) -> DomainResult<()> {
        self.ensure_active("clear items")?;
        if self.items.is_empty() {
            return Ok(());
        }

        let mut removed_items = Vec::with_capacity(self.items.len());
        for mut item in std::mem::take(&mut self.items) {
            self.events.absorb(item.take_events());
            removed_items.push(ClearedItem::from(&item));
        }

        let now = Utc::now();
        self.events.record(CartEvent::CartCleared(CartClearedData {
            cart_id: self.id,
            removed_items,
            occurred_at: now,
        }));
        self.updated_at = now;
        Ok(())
    }

    /// Swaps in an updated copy of the line at `index`.
    fn replace_item(&mut self, index: usize, item: CartItem) -> DomainResult<()> {
        self.ensure_subtotal_fits(Some(item.id()), item.total_price())?;
        self.items[index] = item;
        self.touch();
        Ok(())
    }

    /// Fails if a line totalling `line` (replacing `replaced`, if given) would
    /// push the subtotal out of range.
    fn ensure_subtotal_fits(&self, replaced: Option<CartItemId>, line: Money) -> DomainResult<()> {
        self.items
            .iter()
            .filter(|item| Some(item.id()) != replaced)
            .try_fold(line, |sum, item| sum.add(item.total_price()))
            .map(|_| ())
    }

    fn item_index(&self, item_id: CartItemId) -> DomainResult<usize> {
        self.items
            .iter()
            .position(|item| item.id() == item_id)
            .ok_or_else(|| DomainError::validation("item_id", format!("no item {item_id} in cart")))
    }
}

// Discounts and shipping
impl Cart {
    /// Applies a discount code.
    pub fn apply_discount(&mut self, discount: CartDiscount) -> DomainResult<()> {
        self.ensure_active("apply discount")?;
        discount.ensure_currency(self.currency)?;

        if self.discounts.iter().any(|d| d.code() == discount.code()) {
            return Err(BusinessRuleViolation::DiscountAlreadyApplied(discount.code().to_string()).into());
        }

        let subtotal = self.subtotal();
        if let Some(minimum) = discount.minimum_amount()
            && !discount.is_eligible(subtotal)
        {
            return Err(BusinessRuleViolation::MinimumAmountNotMet { minimum, subtotal }.into());
        }

        let amount = discount.calculate_discount(subtotal)?;
        let now = Utc::now();
        self.events
            .record(CartEvent::CartDiscountApplied(CartDiscountAppliedData {
                cart_id: self.id,
                discount: discount.clone(),
                amount,
                occurred_at: now,
            }));
        self.discounts.push(discount);
        self.updated_at = now;
        Ok(())
    }

    /// Removes a discount by code. Matching ignores case and surrounding
    /// whitespace.
    pub fn remove_discount(&mut self, code: &str) -> DomainResult<()> {
        self.ensure_active("remove discount")?;
        let code = normalize_code(code);
        let index = self
            .discounts
            .iter()
            .position(|d| d.code() == code)
            .ok_or_else(|| {
                DomainError::validation("code", format!("discount {code} is not applied"))
            })?;

        self.discounts.remove(index);
        let now = Utc::now();
        self.events
            .record(CartEvent::CartDiscountRemoved(CartDiscountRemovedData {
                cart_id: self.id,
                code,
                occurred_at: now,
            }));
        self.updated_at = now;
        Ok(())
    }

    /// Replaces the shipping choice.
    pub fn update_shipping(&mut self, shipping: ShippingInformation) -> DomainResult<()> {
        self.ensure_active("update shipping")?;
        self.ensure_currency(shipping.cost())?;
        self.shipping = Some(shipping);
        self.touch();
        Ok(())
    }

    pub fn remove_shipping(&mut self) -> DomainResult<()> {
        self.ensure_active("remove shipping")?;
        if self.shipping.take().is_some() {
            self.touch();
        }
        Ok(())
    }
}

// Ownership and lifecycle
impl Cart {
    /// Hands a guest cart over to a signed-in user.
    ///
    /// A cart that already belongs to a user cannot be reassigned.
    pub fn assign_to_user(&mut self, user_id: UserId) -> DomainResult<()> {
        self.ensure_active("assign to user")?;
        let previous_session_id = match &self.owner {
            CartOwner::User { user_id } => {
                return Err(BusinessRuleViolation::UserAlreadyAssigned(*user_id).into());
            }
            CartOwner::Guest { session_id } => session_id.clone(),
        };

        self.owner = CartOwner::User { user_id };
        let now = Utc::now();
        self.events
            .record(CartEvent::CartAssignedToUser(CartAssignedToUserData {
                cart_id: self.id,
                user_id,
                previous_session_id,
                occurred_at: now,
            }));
        self.updated_at = now;
        Ok(())
    }

    /// Marks the cart as abandoned.
    pub fn abandon(&mut self) -> DomainResult<()> {
        self.ensure_active("abandon")?;
        let now = Utc::now();
        self.events.record(CartEvent::CartAbandoned(CartAbandonedData {
            cart_id: self.id,
            item_count: self.items.len(),
            subtotal: self.subtotal(),
            occurred_at: now,
        }));
        self.status = CartStatus::Abandoned;
        self.updated_at = now;
        Ok(())
    }

    /// Checks the cart out. The cart must hold at least one line.
    pub fn complete(&mut self) -> DomainResult<()> {
        self.ensure_active("complete")?;
        if self.is_empty() {
            return Err(BusinessRuleViolation::EmptyCart.into());
        }
        let now = Utc::now();
        self.events.record(CartEvent::CartCompleted(CartCompletedData {
            cart_id: self.id,
            item_count: self.items.len(),
            total: self.total(),
            occurred_at: now,
        }));
        self.status = CartStatus::Completed;
        self.updated_at = now;
        Ok(())
    }

    /// Marks the cart as expired.
    pub fn expire(&mut self) -> DomainResult<()> {
        self.ensure_active("expire")?;
        let now = Utc::now();
        self.events.record(CartEvent::CartExpired(CartExpiredData {
            cart_id: self.id,
            expires_at: self.expires_at,
            occurred_at: now,
        }));
        self.status = CartStatus::Expired;
        self.updated_at = now;
        Ok(())
    }

    fn ensure_active(&self, action: &'static str) -> DomainResult<()> {
        if !self.status.is_active() {
            return Err(BusinessRuleViolation::InvalidStatus {
                action,
                status: self.status.as_str(),
            }
            .into());
        }
        Ok(())
    }

    fn ensure_currency(&self, money: Money) -> DomainResult<()> {
        Money::zero(self.currency).ensure_same_currency(&money)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Serialized form of a cart, with computed totals for readers.
#[derive(Serialize, Deserialize)]
struct CartSnapshot {
    id: CartId,
    owner: CartOwner,
    currency: Currency,
    status: CartStatus,
    items: Vec<CartItem>,
    discounts: Vec<CartDiscount>,
    shipping: Option<ShippingInformation>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    #[serde(default, skip_deserializing)]
    totals: Option<CartTotals>,
}

impl From<Cart> for CartSnapshot {
    fn from(cart: Cart) -> Self {
        let totals = Some(cart.totals());
        Self {
            id: cart.id,
            owner: cart.owner,
            currency: cart.currency,
            status: cart.status,
            items: cart.items,
            discounts: cart.discounts,
            shipping: cart.shipping,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
            expires_at: cart.expires_at,
            totals,
        }
    }
}

impl TryFrom<CartSnapshot> for Cart {
    type Error = DomainError;

    fn try_from(snapshot: CartSnapshot) -> Result<Self, Self::Error> {
        let cart_currency = Money::zero(snapshot.currency);

        let mut items: Vec<CartItem> = Vec::with_capacity(snapshot.items.len());
        for item in snapshot.items {
            let item = item.validated()?;
            if item.cart_id() != snapshot.id {
                return Err(ValidationError::new(
                    "items",
                    format!("item {} belongs to cart {}", item.id(), item.cart_id()),
                )
                .into());
            }
            cart_currency.ensure_same_currency(&item.unit_price())?;
            if items
                .iter()
                .any(|other| other.is_same_product(item.product_id(), item.variant_id()))
            {
                return Err(ValidationError::new(
                    "items",
                    format!("variant {} appears more than once", item.variant_id()),
                )
                .into());
            }
            items.push(item);
        }
        items
            .iter()
            .try_fold(cart_currency, |sum, item| sum.add(item.total_price()))?;

        let mut discounts: Vec<CartDiscount> = Vec::with_capacity(snapshot.discounts.len());
        for discount in snapshot.discounts {
            let discount = discount.validated()?;
            discount.ensure_currency(snapshot.currency)?;
            if discounts.iter().any(|d| d.code() == discount.code()) {
                return Err(BusinessRuleViolation::DiscountAlreadyApplied(
                    discount.code().to_string(),
                )
                .into());
            }
            discounts.push(discount);
        }

        let shipping = snapshot
            .shipping
            .map(ShippingInformation::validated)
            .transpose()?;
        if let Some(shipping) = &shipping {
            cart_currency.ensure_same_currency(&shipping.cost())?;
        }

        Ok(Self {
            id: snapshot.id,
            owner: snapshot.owner.validated()?,
            currency: snapshot.currency,
            status: snapshot.status,
            items,
            discounts,
            shipping,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            expires_at: snapshot.expires_at,
            events: EventLog::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DomainEvent;

    fn usd(amount: i64) -> Money {
        Money::new(amount, Currency::USD)
    }

    fn tee(quantity: u32, price: Money) -> NewCartItem {
        NewCartItem::new(
            ProductId::new(),
            ProductVariantId::new(),
            "Classic Tee",
            "Medium",
            "TEE-M",
            quantity,
            price,
        )
    }

    fn guest_cart() -> Cart {
        let mut cart = Cart::create_guest("sess-123", Currency::USD).unwrap();
        cart.mark_events_as_committed();
        cart
    }

    fn event_types(cart: &Cart) -> Vec<&'static str> {
        cart.uncommitted_events()
            .iter()
            .map(DomainEvent::event_type)
            .collect()
    }

    fn assert_business_rule(result: DomainResult<()>) {
        match result {
            Err(DomainError::BusinessRule(_)) => {}
            other => panic!("Expected business rule violation, got {other:?}"),
        }
    }

    #[test]
    fn test_create_guest_cart() {
        let cart = Cart::create_guest("sess-123", Currency::USD).unwrap();

        assert_eq!(cart.status(), CartStatus::Active);
        assert_eq!(cart.session_id(), Some("sess-123"));
        assert_eq!(cart.user_id(), None);
        assert!(cart.is_empty());
        assert!(!cart.is_expired());
        assert_eq!(cart.expires_at() - cart.created_at(), Duration::days(DEFAULT_CART_TTL_DAYS));
        assert_eq!(event_types(&cart), vec!["CartCreated"]);
    }

    #[test]
    fn test_create_for_user() {
        let user_id = UserId::new();
        let cart = Cart::create_for_user(user_id, Currency::EUR).unwrap();
        assert_eq!(cart.user_id(), Some(user_id));
        assert_eq!(cart.session_id(), None);
        assert_eq!(cart.currency(), Currency::EUR);
    }

    #[test]
    fn test_create_rejects_blank_session_and_bad_ttl() {
        assert!(Cart::create_guest("  ", Currency::USD).unwrap_err().is_validation());
        let err = Cart::create(CartOwner::guest("s"), Currency::USD, Duration::zero()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_oversized_price_is_rejected_before_totals() {
        let mut cart = guest_cart();
        let err = cart
            .add_item(tee(MAX_ITEM_QUANTITY, usd(i64::MAX / 100)))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), usd(0));

        let item_id = cart
            .add_item(tee(MAX_ITEM_QUANTITY, usd(crate::money::MAX_PRICE_AMOUNT)))
            .unwrap();
        assert_eq!(
            cart.subtotal(),
            usd(crate::money::MAX_PRICE_AMOUNT * i64::from(MAX_ITEM_QUANTITY))
        );
        assert!(
            cart.update_item_price(item_id, usd(i64::MAX), None)
                .unwrap_err()
                .is_validation()
        );
        assert_eq!(cart.item(item_id).unwrap().unit_price(), usd(crate::money::MAX_PRICE_AMOUNT));
    }

    #[test]
    fn test_subtotal_guard_rejects_overflowing_line() {
        let mut cart = guest_cart();
        let item_id = cart.add_item(tee(1, usd(1000))).unwrap();

        assert!(cart.ensure_subtotal_fits(None, usd(i64::MAX)).unwrap_err().is_validation());
        assert!(cart.ensure_subtotal_fits(Some(item_id), usd(i64::MAX)).is_ok());
    }

    #[test]
    fn test_create_rejects_ttl_past_calendar_range() {
        let err = Cart::create(
            CartOwner::guest("s"),
            Currency::USD,
            Duration::days(200_000_000),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation(ValidationError::new("ttl", "expiry is out of range"))
        );
    }

    #[test]
    fn test_add_item() {
        let mut cart = guest_cart();
        let item_id = cart.add_item(tee(2, usd(2500))).unwrap();

        assert_eq!(cart.total_unique_items(), 1);
        assert_eq!(cart.item(item_id).unwrap().quantity(), 2);
        assert_eq!(cart.subtotal(), usd(5000));
        assert_eq!(event_types(&cart), vec!["CartItemAdded"]);
    }

    #[test]
    fn test_add_same_variant_merges_quantities() {
        let mut cart = guest_cart();
        let details = tee(2, usd(2500));
        let first = cart.add_item(details.clone()).unwrap();
        let second = cart.add_item(NewCartItem { quantity: 3, ..details }).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.total_unique_items(), 1);
        assert_eq!(cart.total_items(), 5);
        assert_eq!(
            event_types(&cart),
            vec!["CartItemAdded", "CartItemQuantityChanged"]
        );
    }

    #[test]
    fn test_merge_over_limit_rejected() {
        let mut cart = guest_cart();
        let details = tee(500, usd(100));
        cart.add_item(details.clone()).unwrap();

        let err = cart.add_item(NewCartItem { quantity: 500, ..details }).unwrap_err();
        assert!(matches!(
            err,
            DomainError::BusinessRule(BusinessRuleViolation::QuantityLimitExceeded {
                requested: 1000,
                max: 999
            })
        ));
        assert_eq!(cart.total_items(), 500);
    }

    #[test]
    fn test_add_item_in_other_currency_rejected() {
        let mut cart = guest_cart();
        let err = cart.add_item(tee(1, Money::new(1000, Currency::EUR))).unwrap_err();
        assert!(err.is_business_rule());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_item_keeps_item_events() {
        let mut cart = guest_cart();
        let item_id = cart.add_item(tee(1, usd(1000))).unwrap();
        cart.update_item_quantity(item_id, 4).unwrap();
        cart.remove_item(item_id).unwrap();

        assert!(cart.is_empty());
        assert_eq!(
            event_types(&cart),
            vec!["CartItemAdded", "CartItemQuantityChanged", "CartItemRemoved"]
        );
    }

    #[test]
    fn test_remove_missing_item() {
        let mut cart = guest_cart();
        let err = cart.remove_item(CartItemId::new()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = guest_cart();
        let item_id = cart.add_item(tee(3, usd(1000))).unwrap();
        cart.update_item_quantity(item_id, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_item_price() {
        let mut cart = guest_cart();
        let item_id = cart.add_item(tee(2, usd(1000))).unwrap();
        cart.update_item_price(item_id, usd(800), Some(usd(1000))).unwrap();

        let item = cart.item(item_id).unwrap();
        assert!(item.is_on_sale());
        assert_eq!(cart.subtotal(), usd(1600));
    }

    #[test]
    fn test_clear_items() {
        let mut cart = guest_cart();
        cart.add_item(tee(1, usd(1000))).unwrap();
        cart.add_item(tee(2, usd(500))).unwrap();
        cart.mark_events_as_committed();

        cart.clear_items().unwrap();

        assert!(cart.is_empty());
        let events = cart.uncommitted_events();
        assert_eq!(events.len(), 1);
        if let CartEvent::CartCleared(data) = &events[0] {
            assert_eq!(data.removed_items.len(), 2);
        } else {
            panic!("Expected CartCleared event");
        }
    }

    #[test]
    fn test_clear_empty_cart_is_noop() {
        let mut cart = guest_cart();
        cart.clear_items().unwrap();
        assert!(!cart.has_uncommitted_events());
    }

    #[test]
    fn test_total_with_discount_and_shipping() {
        let mut cart = guest_cart();
        cart.add_item(tee(1, Money::from_major(100, Currency::USD).unwrap())).unwrap();
        cart.apply_discount(CartDiscount::percentage("SAVE10", 10.0, "10% off").unwrap())
            .unwrap();
        cart.update_shipping(ShippingInformation::new("standard", usd(599)).unwrap())
            .unwrap();

        assert_eq!(cart.total_discounts(), usd(1000));
        assert_eq!(cart.shipping_cost(), usd(599));
        assert_eq!(cart.total().decimal_amount(), 95.99);
    }

    #[test]
    fn test_discounts_stack_against_subtotal() {
        let mut cart = guest_cart();
        cart.add_item(tee(1, usd(10000))).unwrap();
        cart.apply_discount(CartDiscount::percentage("TEN", 10.0, "").unwrap())
            .unwrap();
        cart.apply_discount(CartDiscount::percentage("TWENTY", 20.0, "").unwrap())
            .unwrap();

        assert_eq!(cart.total_discounts(), usd(3000));
        assert_eq!(cart.total(), usd(7000));
    }

    #[test]
    fn test_total_floors_at_zero() {
        let mut cart = guest_cart();
        cart.add_item(tee(1, usd(1000))).unwrap();
        cart.apply_discount(CartDiscount::fixed("A", usd(1000), "").unwrap())
            .unwrap();
        cart.apply_discount(CartDiscount::fixed("B", usd(1000), "").unwrap())
            .unwrap();

        assert_eq!(cart.total(), usd(0));
    }

    #[test]
    fn test_duplicate_discount_rejected() {
        let mut cart = guest_cart();
        cart.add_item(tee(1, usd(1000))).unwrap();
        let discount = CartDiscount::percentage("SAVE10", 10.0, "").unwrap();
        cart.apply_discount(discount.clone()).unwrap();

        assert_business_rule(cart.apply_discount(discount.clone()));

        cart.remove_discount("save10").unwrap();
        cart.apply_discount(discount).unwrap();
        assert_eq!(cart.discounts().len(), 1);
    }

    #[test]
    fn test_discount_minimum_not_met() {
        let mut cart = guest_cart();
        cart.add_item(tee(1, usd(1000))).unwrap();
        let discount = CartDiscount::fixed("BIG", usd(500), "")
            .unwrap()
            .with_minimum_amount(usd(5000))
            .unwrap();

        let err = cart.apply_discount(discount).unwrap_err();
        assert!(matches!(
            err,
            DomainError::BusinessRule(BusinessRuleViolation::MinimumAmountNotMet { .. })
        ));
    }

    #[test]
    fn test_remove_unknown_discount() {
        let mut cart = guest_cart();
        assert!(cart.remove_discount("NOPE").unwrap_err().is_validation());
    }

    #[test]
    fn test_shipping_currency_and_removal() {
        let mut cart = guest_cart();
        let euro = ShippingInformation::new("dhl", Money::new(500, Currency::EUR)).unwrap();
        assert_business_rule(cart.update_shipping(euro));

        cart.update_shipping(ShippingInformation::new("ups", usd(500)).unwrap())
            .unwrap();
        cart.remove_shipping().unwrap();
        assert_eq!(cart.shipping_cost(), usd(0));
    }

    #[test]
    fn test_assign_to_user() {
        let mut cart = guest_cart();
        let user_id = UserId::new();
        cart.assign_to_user(user_id).unwrap();

        assert_eq!(cart.user_id(), Some(user_id));
        assert_eq!(cart.session_id(), None);
        assert_eq!(event_types(&cart), vec!["CartAssignedToUser"]);

        assert_business_rule(cart.assign_to_user(user_id));
        assert_business_rule(cart.assign_to_user(UserId::new()));
    }

    #[test]
    fn test_complete_requires_items() {
        let mut cart = guest_cart();
        let err = cart.complete().unwrap_err();
        assert!(matches!(
            err,
            DomainError::BusinessRule(BusinessRuleViolation::EmptyCart)
        ));

        cart.add_item(tee(1, usd(1000))).unwrap();
        assert!(cart.can_checkout());
        cart.complete().unwrap();
        assert_eq!(cart.status(), CartStatus::Completed);
        assert!(!cart.can_checkout());
    }

    #[test]
    fn test_transitions_from_terminal_status_rejected() {
        let terminal: [fn(&mut Cart) -> DomainResult<()>; 2] = [Cart::abandon, Cart::expire];
        for transition in terminal {
            let mut cart = guest_cart();
            transition(&mut cart).unwrap();

            assert_business_rule(cart.abandon());
            assert_business_rule(cart.expire());
            assert_business_rule(cart.complete());
            assert_business_rule(cart.add_item(tee(1, usd(100))).map(|_| ()));
            assert_business_rule(cart.clear_items());
        }
    }

    #[test]
    fn test_is_expired_at() {
        let cart = guest_cart();
        assert!(!cart.is_expired_at(cart.expires_at()));
        assert!(cart.is_expired_at(cart.expires_at() + Duration::seconds(1)));
    }

    #[test]
    fn test_mark_events_as_committed_cascades() {
        let mut cart = guest_cart();
        let item_id = cart.add_item(tee(1, usd(1000))).unwrap();
        cart.update_item_quantity(item_id, 2).unwrap();
        assert_eq!(cart.uncommitted_events().len(), 2);

        cart.mark_events_as_committed();
        assert!(!cart.has_uncommitted_events());
        assert!(cart.item(item_id).unwrap().pending_events().is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut cart = guest_cart();
        cart.add_item(tee(2, usd(2500)).with_compare_at_price(usd(3000)))
            .unwrap();
        cart.apply_discount(CartDiscount::percentage("SAVE10", 10.0, "").unwrap())
            .unwrap();

        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["status"], "ACTIVE");
        assert_eq!(json["owner"]["type"], "guest");
        assert_eq!(json["totals"]["subtotal"]["amount"], 5000);
        assert_eq!(json["totals"]["total"]["decimal_amount"], 45.0);

        let restored: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(restored.id(), cart.id());
        assert_eq!(restored.totals(), cart.totals());
        assert!(!restored.has_uncommitted_events());
    }

    #[test]
    fn test_snapshot_with_foreign_item_rejected() {
        let mut cart = guest_cart();
        cart.add_item(tee(1, usd(1000))).unwrap();

        let mut json = serde_json::to_value(&cart).unwrap();
        json["items"][0]["cart_id"] = serde_json::json!(CartId::new());
        assert!(serde_json::from_value::<Cart>(json).is_err());
    }

    #[test]
    fn test_snapshot_with_oversized_price_rejected() {
        let mut cart = guest_cart();
        cart.add_item(tee(999, usd(1000))).unwrap();

        let mut json = serde_json::to_value(&cart).unwrap();
        json["items"][0]["unit_price"]["amount"] = serde_json::json!(i64::MAX / 100);
        assert!(serde_json::from_value::<Cart>(json).is_err());
    }
}
