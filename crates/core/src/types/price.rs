//! Server-computed money amounts.
//!
//! The backend owns every price, subtotal, discount and tax figure. `Price`
//! only carries the decimal it was given and formats it for display; it never
//! performs arithmetic that could drift from the server's numbers.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A money amount as reported by the backend.
///
/// Deserializes from either a JSON string (`"150.00"`) or a number (`150`),
/// keeping the scale the server sent so `"150.00"` displays as `₹150.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The raw decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true when the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CurrencyCode::INR.symbol(), self.0)
    }
}

/// ISO 4217 currency codes used by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
        }
    }

    /// ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_price_from_string_keeps_scale() {
        let price: Price = serde_json::from_str("\"150.00\"").unwrap();
        assert_eq!(price.to_string(), "₹150.00");
    }

    #[test]
    fn test_price_from_number() {
        let price: Price = serde_json::from_str("50").unwrap();
        assert_eq!(price.amount(), Decimal::new(50, 0));
        assert!(!price.is_zero());
        assert!(Price::ZERO.is_zero());
    }
}
