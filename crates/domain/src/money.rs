//! Money and currency value objects.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BusinessRuleViolation, DomainError, DomainResult, ValidationError};

/// Supported ISO 4217 currencies. All use two-decimal minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    NZD,
    CHF,
    SEK,
}

impl Currency {
    /// Returns the ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::NZD => "NZD",
            Currency::CHF => "CHF",
            Currency::SEK => "SEK",
        }
    }

    /// Returns the display symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD | Currency::CAD | Currency::AUD | Currency::NZD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::CHF => "CHF ",
            Currency::SEK => "kr ",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "CAD" => Ok(Currency::CAD),
            "AUD" => Ok(Currency::AUD),
            "NZD" => Ok(Currency::NZD),
            "CHF" => Ok(Currency::CHF),
            "SEK" => Ok(Currency::SEK),
            _ => Err(ValidationError::new(
                "currency",
                format!("unsupported currency code {s:?}"),
            )),
        }
    }
}

/// An amount in minor currency units (e.g. 1000 = $10.00) tagged with its
/// currency.
///
/// Largest unit price or fee, in minor units, that entities accept.
///
/// Keeps line totals (price times at most 999 units) and cart sums far from
/// the `i64` range.
pub const MAX_PRICE_AMOUNT: i64 = 100_000_000_000;

/// Arithmetic between two amounts requires matching currencies. Amounts are
/// signed; entities that need a positive price check it themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "MoneyRepr", from = "MoneyRepr")]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates money from minor units.
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates money from whole major units (e.g. dollars).
    pub fn from_major(units: i64, currency: Currency) -> DomainResult<Self> {
        units
            .checked_mul(100)
            .map(|amount| Self::new(amount, currency))
            .ok_or_else(overflow)
    }

    /// Returns zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Returns the amount in minor units.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns the amount in major units (amount / 100).
    pub fn decimal_amount(&self) -> f64 {
        self.amount as f64 / 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }

    /// Fails with `CurrencyMismatch` unless `other` shares this currency.
    pub fn ensure_same_currency(&self, other: &Money) -> DomainResult<()> {
        if self.currency != other.currency {
            return Err(BusinessRuleViolation::CurrencyMismatch {
                expected: self.currency,
                actual: other.currency,
            }
            .into());
        }
        Ok(())
    }

    pub fn add(&self, other: Money) -> DomainResult<Money> {
        self.ensure_same_currency(&other)?;
        self.with_amount(self.amount.checked_add(other.amount))
    }

    pub fn subtract(&self, other: Money) -> DomainResult<Money> {
        self.ensure_same_currency(&other)?;
        self.with_amount(self.amount.checked_sub(other.amount))
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> DomainResult<Money> {
        self.with_amount(self.amount.checked_mul(i64::from(quantity)))
    }

    /// Multiplies by a quantity, clamping at the bounds of `i64`.
    ///
    /// For amounts already bounded by [`MAX_PRICE_AMOUNT`], where the product
    /// cannot overflow.
    pub fn saturating_multiply(&self, quantity: u32) -> Money {
        Money::new(self.amount.saturating_mul(i64::from(quantity)), self.currency)
    }

    fn with_amount(&self, amount: Option<i64>) -> DomainResult<Money> {
        amount
            .map(|amount| Money::new(amount, self.currency))
            .ok_or_else(overflow)
    }

    /// Returns `percent`% of this amount, rounded to the nearest minor unit.
    pub fn percentage(&self, percent: f64) -> Money {
        let amount = (self.amount as f64 * percent / 100.0).round() as i64;
        Money::new(amount, self.currency)
    }

    /// Returns the smaller of two amounts.
    pub fn min(self, other: Money) -> DomainResult<Money> {
        self.ensure_same_currency(&other)?;
        Ok(if other.amount < self.amount { other } else { self })
    }

    /// Returns the larger of two amounts.
    pub fn max(self, other: Money) -> DomainResult<Money> {
        self.ensure_same_currency(&other)?;
        Ok(if other.amount > self.amount { other } else { self })
    }

    /// Returns zero if the amount is negative.
    pub fn clamp_non_negative(self) -> Money {
        Money::new(self.amount.max(0), self.currency)
    }
}

fn overflow() -> DomainError {
    ValidationError::new("amount", "is outside the supported range").into()
}

/// Amounts in different currencies are unordered.
impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.currency == other.currency).then(|| self.amount.cmp(&other.amount))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        write!(
            f,
            "{sign}{}{}.{:02} {}",
            self.currency.symbol(),
            abs / 100,
            abs % 100,
            self.currency.code()
        )
    }
}

#[derive(Serialize, Deserialize)]
struct MoneyRepr {
    amount: i64,
    currency: Currency,
    #[serde(default, skip_deserializing)]
    decimal_amount: f64,
}

impl From<Money> for MoneyRepr {
    fn from(money: Money) -> Self {
        Self {
            amount: money.amount,
            currency: money.currency,
            decimal_amount: money.decimal_amount(),
        }
    }
}

impl From<MoneyRepr> for Money {
    fn from(repr: MoneyRepr) -> Self {
        Money::new(repr.amount, repr.currency)
    }
}
