//! Cart status state machine.

use serde::{Deserialize, Serialize};

/// The status of a cart in its lifecycle.
///
/// State transitions:
/// ```text
///          ┌──► Abandoned
/// Active ──┼──► Completed
///          └──► Expired
/// ```
/// `Active` is the only non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    /// Cart accepts changes.
    #[default]
    Active,

    /// Shopper left without checking out (terminal state).
    Abandoned,

    /// Cart was checked out (terminal state).
    Completed,

    /// Cart outlived its expiry (terminal state).
    Expired,
}

impl CartStatus {
    /// Returns true if items, discounts, and shipping can be changed.
    pub fn is_active(&self) -> bool {
        matches!(self, CartStatus::Active)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "ACTIVE",
            CartStatus::Abandoned => "ABANDONED",
            CartStatus::Completed => "COMPLETED",
            CartStatus::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_active() {
        assert_eq!(CartStatus::default(), CartStatus::Active);
    }

    #[test]
    fn test_only_active_is_non_terminal() {
        assert!(!CartStatus::Active.is_terminal());
        assert!(CartStatus::Abandoned.is_terminal());
        assert!(CartStatus::Completed.is_terminal());
        assert!(CartStatus::Expired.is_terminal());
    }

    #[test]
    fn test_serialization_uses_upper_case() {
        let json = serde_json::to_string(&CartStatus::Abandoned).unwrap();
        assert_eq!(json, "\"ABANDONED\"");
        let status: CartStatus = serde_json::from_str("\"EXPIRED\"").unwrap();
        assert_eq!(status, CartStatus::Expired);
        assert_eq!(CartStatus::Completed.to_string(), "COMPLETED");
    }
}
