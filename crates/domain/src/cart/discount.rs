//! Discount codes applied to a cart.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BusinessRuleViolation, DomainResult, ValidationError};
use crate::money::{Currency, Money};
use crate::validation::required_text;

/// How much a discount takes off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountValue {
    /// Percent of the amount, in `(0, 100]`.
    Percentage(f64),

    /// A fixed amount.
    Fixed(Money),
}

/// A discount code applied to a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartDiscount {
    id: Uuid,
    code: String,
    value: DiscountValue,
    #[serde(default)]
    description: String,
    minimum_amount: Option<Money>,
    maximum_discount: Option<Money>,
    #[serde(default = "default_applies_to")]
    applies_to: String,
}

fn default_applies_to() -> String {
    "order".to_string()
}

/// Trims and upper-cases a discount code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl CartDiscount {
    pub fn new(
        code: impl Into<String>,
        value: DiscountValue,
        description: impl Into<String>,
    ) -> DomainResult<Self> {
        let discount = Self {
            id: Uuid::new_v4(),
            code: code.into(),
            value,
            description: description.into().trim().to_string(),
            minimum_amount: None,
            maximum_discount: None,
            applies_to: default_applies_to(),
        };
        discount.validated()
    }

    /// Creates a percentage discount, e.g. `10.0` for 10% off.
    pub fn percentage(
        code: impl Into<String>,
        percent: f64,
        description: impl Into<String>,
    ) -> DomainResult<Self> {
        Self::new(code, DiscountValue::Percentage(percent), description)
    }

    /// Creates a fixed-amount discount.
    pub fn fixed(
        code: impl Into<String>,
        amount: Money,
        description: impl Into<String>,
    ) -> DomainResult<Self> {
        Self::new(code, DiscountValue::Fixed(amount), description)
    }

    /// Only discount amounts of at least `minimum`.
    pub fn with_minimum_amount(mut self, minimum: Money) -> DomainResult<Self> {
        self.minimum_amount = Some(minimum);
        self.validated()
    }

    /// Never take off more than `maximum`.
    pub fn with_maximum_discount(mut self, maximum: Money) -> DomainResult<Self> {
        self.maximum_discount = Some(maximum);
        self.validated()
    }

    pub fn with_applies_to(mut self, applies_to: impl Into<String>) -> DomainResult<Self> {
        self.applies_to = applies_to.into();
        self.validated()
    }

    /// Normalizes the code and checks every field.
    ///
    /// Also used when rehydrating a cart from a snapshot.
    pub(crate) fn validated(mut self) -> DomainResult<Self> {
        self.code = normalize_code(&required_text("code", self.code)?);
        self.applies_to = required_text("applies_to", self.applies_to)?;

        match self.value {
            DiscountValue::Percentage(percent) => {
                if !percent.is_finite() || percent <= 0.0 || percent > 100.0 {
                    return Err(ValidationError::new(
                        "value",
                        format!("percentage must be greater than 0 and at most 100 (got {percent})"),
                    )
                    .into());
                }
            }
            DiscountValue::Fixed(amount) => {
                if !amount.is_positive() {
                    return Err(
                        ValidationError::new("value", "fixed amount must be greater than zero").into(),
                    );
                }
            }
        }

        if let Some(minimum) = self.minimum_amount
            && minimum.is_negative()
        {
            return Err(ValidationError::new("minimum_amount", "must not be negative").into());
        }
        if let Some(maximum) = self.maximum_discount
            && !maximum.is_positive()
        {
            return Err(
                ValidationError::new("maximum_discount", "must be greater than zero").into(),
            );
        }

        let currency = self.amounts().next().map(|first| first.currency());
        if let Some(currency) = currency {
            self.ensure_currency(currency)?;
        }
        Ok(self)
    }

    fn amounts(&self) -> impl Iterator<Item = Money> + '_ {
        let fixed = match self.value {
            DiscountValue::Fixed(amount) => Some(amount),
            DiscountValue::Percentage(_) => None,
        };
        fixed
            .into_iter()
            .chain(self.minimum_amount)
            .chain(self.maximum_discount)
    }

    /// Fails with `CurrencyMismatch` if any amount on the discount is not in
    /// `currency`.
    pub fn ensure_currency(&self, currency: Currency) -> DomainResult<()> {
        match self.amounts().find(|amount| amount.currency() != currency) {
            Some(amount) => Err(BusinessRuleViolation::CurrencyMismatch {
                expected: currency,
                actual: amount.currency(),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Returns how much this discount takes off `amount`.
    ///
    /// Zero below the minimum amount, capped at the maximum discount, and
    /// never more than `amount` itself.
    pub fn calculate_discount(&self, amount: Money) -> DomainResult<Money> {
        self.ensure_currency(amount.currency())?;
        Ok(self.amount_off(amount))
    }

    /// Same as [`calculate_discount`](Self::calculate_discount) for an
    /// `amount` already known to be in the discount's currency.
    pub(crate) fn amount_off(&self, amount: Money) -> Money {
        if self.minimum_amount.is_some_and(|minimum| amount.amount() < minimum.amount()) {
            return Money::zero(amount.currency());
        }

        let mut discount = match self.value {
            DiscountValue::Percentage(percent) => amount.percentage(percent).amount(),
            DiscountValue::Fixed(fixed) => fixed.amount(),
        };
        if let Some(maximum) = self.maximum_discount {
            discount = discount.min(maximum.amount());
        }
        Money::new(discount.min(amount.amount()), amount.currency()).clamp_non_negative()
    }

    /// Returns true if `subtotal` reaches the minimum amount, if one is set.
    pub fn is_eligible(&self, subtotal: Money) -> bool {
        self.minimum_amount
            .is_none_or(|minimum| subtotal.amount() >= minimum.amount())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn value(&self) -> DiscountValue {
        self.value
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn minimum_amount(&self) -> Option<Money> {
        self.minimum_amount
    }

    pub fn maximum_discount(&self) -> Option<Money> {
        self.maximum_discount
    }

    pub fn applies_to(&self) -> &str {
        &self.applies_to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;

    fn usd(amount: i64) -> Money {
        Money::new(amount, Currency::USD)
    }

    #[test]
    fn test_percentage_discount() {
        let discount = CartDiscount::percentage(" save10 ", 10.0, "10% off").unwrap();
        assert_eq!(discount.code(), "SAVE10");
        assert_eq!(discount.applies_to(), "order");
        assert_eq!(discount.calculate_discount(usd(10000)).unwrap(), usd(1000));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_amount() {
        let discount = CartDiscount::fixed("FIVE", usd(500), "").unwrap();
        assert_eq!(discount.calculate_discount(usd(2000)).unwrap(), usd(500));
        assert_eq!(discount.calculate_discount(usd(300)).unwrap(), usd(300));
    }

    #[test]
    fn test_minimum_amount() {
        let discount = CartDiscount::percentage("BIG", 20.0, "")
            .unwrap()
            .with_minimum_amount(usd(5000))
            .unwrap();

        assert_eq!(discount.calculate_discount(usd(4999)).unwrap(), usd(0));
        assert_eq!(discount.calculate_discount(usd(5000)).unwrap(), usd(1000));
        assert!(!discount.is_eligible(usd(4999)));
        assert!(discount.is_eligible(usd(5000)));
    }

    #[test]
    fn test_maximum_discount_caps() {
        let discount = CartDiscount::percentage("HALF", 50.0, "")
            .unwrap()
            .with_maximum_discount(usd(2000))
            .unwrap();
        assert_eq!(discount.calculate_discount(usd(10000)).unwrap(), usd(2000));
        assert_eq!(discount.calculate_discount(usd(3000)).unwrap(), usd(1500));
    }

    #[test]
    fn test_invalid_values() {
        for percent in [0.0, -5.0, 100.5, f64::NAN] {
            let err = CartDiscount::percentage("X", percent, "").unwrap_err();
            assert!(err.is_validation(), "{percent} must be rejected");
        }
        assert!(CartDiscount::percentage("FULL", 100.0, "").is_ok());
        assert!(CartDiscount::fixed("X", usd(0), "").unwrap_err().is_validation());
        assert!(CartDiscount::percentage("  ", 10.0, "").unwrap_err().is_validation());
    }

    #[test]
    fn test_mixed_currencies_rejected() {
        let err = CartDiscount::fixed("FIVE", usd(500), "")
            .unwrap()
            .with_minimum_amount(Money::new(1000, Currency::EUR))
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::BusinessRule(BusinessRuleViolation::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_bounds_must_share_the_fixed_amount_currency() {
        let err = CartDiscount::fixed("FIVE", usd(500), "")
            .unwrap()
            .with_maximum_discount(Money::new(400, Currency::GBP))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::BusinessRule(BusinessRuleViolation::CurrencyMismatch {
                expected: Currency::USD,
                actual: Currency::GBP,
            })
        );

        let discount = CartDiscount::percentage("TEN", 10.0, "")
            .unwrap()
            .with_minimum_amount(usd(1000))
            .unwrap()
            .with_maximum_discount(usd(300))
            .unwrap();
        assert_eq!(discount.minimum_amount(), Some(usd(1000)));
        assert_eq!(discount.maximum_discount(), Some(usd(300)));
    }

    #[test]
    fn test_amount_off_matches_calculate_discount() {
        let discount = CartDiscount::percentage("HALF", 50.0, "")
            .unwrap()
            .with_minimum_amount(usd(1000))
            .unwrap()
            .with_maximum_discount(usd(2000))
            .unwrap();
        for amount in [usd(999), usd(1000), usd(3000), usd(10000)] {
            assert_eq!(
                discount.amount_off(amount),
                discount.calculate_discount(amount).unwrap()
            );
        }
    }

    #[test]
    fn test_calculate_in_other_currency_fails() {
        let discount = CartDiscount::fixed("FIVE", usd(500), "").unwrap();
        assert!(discount.ensure_currency(Currency::USD).is_ok());
        assert!(
            discount
                .calculate_discount(Money::new(1000, Currency::GBP))
                .unwrap_err()
                .is_business_rule()
        );

        let percent = CartDiscount::percentage("TEN", 10.0, "").unwrap();
        assert!(percent.ensure_currency(Currency::GBP).is_ok());
    }

    #[test]
    fn test_serialization() {
        let discount = CartDiscount::percentage("SAVE10", 10.0, "10% off").unwrap();
        let json = serde_json::to_value(&discount).unwrap();
        assert_eq!(json["code"], "SAVE10");
        assert_eq!(json["value"]["type"], "percentage");
        assert_eq!(json["value"]["value"], 10.0);

        let back: CartDiscount = serde_json::from_value(json).unwrap();
        assert_eq!(back, discount);
    }
}
