//! Shipping choice attached to a cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainResult, ValidationError};
use crate::money::Money;
use crate::validation::{required_text, within_price_limit};

/// Selected shipping method and its cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingInformation {
    method: String,
    cost: Money,
    estimated_delivery: Option<DateTime<Utc>>,
    description: Option<String>,
}

impl ShippingInformation {
    pub fn new(method: impl Into<String>, cost: Money) -> DomainResult<Self> {
        Self {
            method: method.into(),
            cost,
            estimated_delivery: None,
            description: None,
        }
        .validated()
    }

    pub fn with_estimated_delivery(mut self, estimated_delivery: DateTime<Utc>) -> Self {
        self.estimated_delivery = Some(estimated_delivery);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub(crate) fn validated(mut self) -> DomainResult<Self> {
        self.method = required_text("method", self.method)?;
        if self.cost.is_negative() {
            return Err(ValidationError::new("cost", "must not be negative").into());
        }
        within_price_limit("cost", self.cost)?;
        Ok(self)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn cost(&self) -> Money {
        self.cost
    }

    pub fn estimated_delivery(&self) -> Option<DateTime<Utc>> {
        self.estimated_delivery
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_free(&self) -> bool {
        self.cost.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_new_shipping() {
        let shipping = ShippingInformation::new(" standard ", Money::new(599, Currency::USD))
            .unwrap()
            .with_description("3-5 business days");
        assert_eq!(shipping.method(), "standard");
        assert_eq!(shipping.description(), Some("3-5 business days"));
        assert!(!shipping.is_free());
    }

    #[test]
    fn test_free_shipping() {
        let shipping = ShippingInformation::new("pickup", Money::zero(Currency::USD)).unwrap();
        assert!(shipping.is_free());
    }

    #[test]
    fn test_invalid_shipping() {
        let cost = Money::new(599, Currency::USD);
        assert!(ShippingInformation::new("", cost).unwrap_err().is_validation());
        assert!(
            ShippingInformation::new("express", Money::new(-1, Currency::USD))
                .unwrap_err()
                .is_validation()
        );
        assert!(
            ShippingInformation::new("freight", Money::new(i64::MAX, Currency::USD))
                .unwrap_err()
                .is_validation()
        );
    }
}
