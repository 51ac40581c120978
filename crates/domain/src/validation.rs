//! Field validators shared by entities and value objects.

use crate::error::{DomainResult, ValidationError};
use crate::money::{MAX_PRICE_AMOUNT, Money};

/// Trims `value` and rejects it if nothing is left.
pub(crate) fn required_text(
    field: &'static str,
    value: impl Into<String>,
) -> Result<String, ValidationError> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Rejects `value` if it is longer than `max` characters.
pub(crate) fn max_chars(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("must be at most {max} characters (got {len})"),
        ));
    }
    Ok(())
}

/// Checks a selling price and its optional compare-at price.
///
/// The price must be positive; a compare-at price must share its currency
/// and be strictly greater. Neither may exceed [`MAX_PRICE_AMOUNT`].
pub(crate) fn price_pair(price: Money, compare_at_price: Option<Money>) -> DomainResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::new("price", "must be greater than zero").into());
    }
    within_price_limit("price", price)?;
    if let Some(compare_at) = compare_at_price {
        price.ensure_same_currency(&compare_at)?;
        within_price_limit("compare_at_price", compare_at)?;
        if compare_at.amount() <= price.amount() {
            return Err(ValidationError::new(
                "compare_at_price",
                format!("must be greater than the price ({compare_at} <= {price})"),
            )
            .into());
        }
    }
    Ok(())
}

/// Rejects amounts above [`MAX_PRICE_AMOUNT`].
pub(crate) fn within_price_limit(field: &'static str, money: Money) -> Result<(), ValidationError> {
    if money.amount() > MAX_PRICE_AMOUNT {
        return Err(ValidationError::new(
            field,
            format!("must be at most {MAX_PRICE_AMOUNT} minor units (got {})", money.amount()),
        ));
    }
    Ok(())
}
