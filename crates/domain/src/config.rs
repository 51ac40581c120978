//! Commerce configuration loaded from environment variables.

use chrono::Duration;

use crate::error::{DomainResult, ValidationError};
use crate::money::Currency;

/// Longest cart lifetime accepted from `CART_TTL_DAYS`.
pub const MAX_CART_TTL_DAYS: i64 = 3650;

/// Commerce settings with sensible defaults.
///
/// Reads from environment variables:
/// - `DEFAULT_CURRENCY`: currency for new carts (default: `USD`)
/// - `CART_TTL_DAYS`: days until a new cart expires (default: `30`, at most
///   [`MAX_CART_TTL_DAYS`])
/// - `COMMAND_MAX_RETRIES`: retries after a concurrency conflict (default: `3`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommerceConfig {
    pub default_currency: Currency,
    pub cart_ttl_days: i64,
    pub max_conflict_retries: u32,
}

impl CommerceConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            default_currency: lookup("DEFAULT_CURRENCY")
                .and_then(|c| c.parse().ok())
                .unwrap_or(defaults.default_currency),
            cart_ttl_days: lookup("CART_TTL_DAYS")
                .and_then(|d| d.parse().ok())
                .filter(|days| (1..=MAX_CART_TTL_DAYS).contains(days))
                .unwrap_or(defaults.cart_ttl_days),
            max_conflict_retries: lookup("COMMAND_MAX_RETRIES")
                .and_then(|r| r.parse().ok())
                .unwrap_or(defaults.max_conflict_retries),
        }
    }

    /// Returns the lifetime of a new cart.
    ///
    /// Fails if `cart_ttl_days` does not fit in a [`Duration`].
    pub fn cart_ttl(&self) -> DomainResult<Duration> {
        Duration::try_days(self.cart_ttl_days).ok_or_else(|| {
            ValidationError::new(
                "cart_ttl_days",
                format!("{} days is out of range", self.cart_ttl_days),
            )
            .into()
        })
    }
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            default_currency: Currency::USD,
            cart_ttl_days: 30,
            max_conflict_retries: 3,
        }
    }
}
