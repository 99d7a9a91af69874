//! Value objects for the rung domain.
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain errors for validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Price must be positive
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Symbol must be a valid trading pair
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Instrument spec validation error
    #[error("Invalid instrument spec: {0}")]
    InvalidInstrument(String),

    /// Ladder configuration error
    #[error("Invalid ladder: {0}")]
    InvalidLadder(String),

    /// Capital tier table error
    #[error("Invalid tier table: {0}")]
    InvalidTierTable(String),

    /// Invalid lifecycle state transition
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

// =============================================================================
// Price
// =============================================================================

/// Price represents a positive decimal price
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidPrice("Price must be positive".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// Quantity represents a positive decimal contract quantity
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a new Quantity with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidQuantity` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidQuantity("Quantity must be positive".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Symbol
// =============================================================================

/// Symbol represents a perpetual futures pair (e.g., BTC_USDT)
///
/// # Invariants
/// - Base and quote must be non-empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    base: String,
    quote: String,
}

impl Symbol {
    /// Create a Symbol from a pair string with an underscore separator
    ///
    /// # Examples
    /// ```
    /// # use rung_domain::value_objects::Symbol;
    /// let symbol = Symbol::from_pair("BTC_USDT").unwrap();
    /// assert_eq!(symbol.base(), "BTC");
    /// assert_eq!(symbol.quote(), "USDT");
    /// ```
    ///
    /// # Errors
    /// Returns `DomainError::InvalidSymbol` if the format is invalid
    pub fn from_pair(pair: &str) -> Result<Self, DomainError> {
        match pair.split_once('_') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() => Ok(Self {
                base: base.to_string(),
                quote: quote.to_string(),
            }),
            _ => Err(DomainError::InvalidSymbol(format!(
                "Cannot parse futures pair: {}",
                pair
            ))),
        }
    }

    /// Create a Symbol from explicit base and quote
    pub fn new(base: String, quote: String) -> Result<Self, DomainError> {
        if base.is_empty() || quote.is_empty() {
            return Err(DomainError::InvalidSymbol(
                "Base and quote must be non-empty".to_string(),
            ));
        }
        Ok(Self { base, quote })
    }

    /// Get the base currency
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Get the quote currency
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Get the pair as the exchange formats it (e.g., "BTC_USDT")
    pub fn as_pair(&self) -> String {
        format!("{}_{}", self.base, self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_pair())
    }
}

// =============================================================================
// Side
// =============================================================================

/// Side represents the position direction (hedge-mode positions carry
/// their direction explicitly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Long position
    Long,
    /// Short position
    Short,
}

impl Side {
    /// Direction sign used in offset math: +1 for Long, -1 for Short
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// Get the entry action for this side
    ///
    /// Long → Buy, Short → Sell
    pub fn entry_action(&self) -> OrderSide {
        match self {
            Side::Long => OrderSide::Buy,
            Side::Short => OrderSide::Sell,
        }
    }

    /// Get the exit action for this side
    ///
    /// Long → Sell, Short → Buy
    pub fn exit_action(&self) -> OrderSide {
        match self {
            Side::Long => OrderSide::Sell,
            Side::Short => OrderSide::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// OrderSide represents the order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

// =============================================================================
// TriggerDirection
// =============================================================================

/// Which way price must move through the trigger level to fire a
/// conditional order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerDirection {
    /// Fires when price trades at or above the trigger level
    AtOrAbove,
    /// Fires when price trades at or below the trigger level
    AtOrBelow,
}

impl fmt::Display for TriggerDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerDirection::AtOrAbove => write!(f, ">="),
            TriggerDirection::AtOrBelow => write!(f, "<="),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_validation() {
        assert!(Price::new(dec!(100.0)).is_ok());
        assert!(Price::new(dec!(0.01)).is_ok());
        assert!(Price::new(dec!(-1.0)).is_err());
        assert!(Price::new(dec!(0.0)).is_err());
    }

    #[test]
    fn test_price_as_decimal() {
        let price = Price::new(dec!(12345.67)).unwrap();
        assert_eq!(price.as_decimal(), dec!(12345.67));
    }

    #[test]
    fn test_quantity_validation() {
        assert!(Quantity::new(dec!(0.001)).is_ok());
        assert!(Quantity::new(dec!(100.0)).is_ok());
        assert!(Quantity::new(dec!(-0.1)).is_err());
        assert!(Quantity::new(dec!(0.0)).is_err());
    }

    #[test]
    fn test_symbol_from_pair() {
        let symbol = Symbol::from_pair("BTC_USDT").unwrap();
        assert_eq!(symbol.base(), "BTC");
        assert_eq!(symbol.quote(), "USDT");
        assert_eq!(symbol.as_pair(), "BTC_USDT");
    }

    #[test]
    fn test_symbol_invalid() {
        assert!(Symbol::from_pair("BTCUSDT").is_err());
        assert!(Symbol::from_pair("_USDT").is_err());
        assert!(Symbol::from_pair("BTC_").is_err());
        assert!(Symbol::from_pair("").is_err());
    }

    #[test]
    fn test_side_actions() {
        assert_eq!(Side::Long.entry_action(), OrderSide::Buy);
        assert_eq!(Side::Long.exit_action(), OrderSide::Sell);
        assert_eq!(Side::Short.entry_action(), OrderSide::Sell);
        assert_eq!(Side::Short.exit_action(), OrderSide::Buy);
    }

    #[test]
    fn test_side_sign() {
        assert_eq!(Side::Long.sign(), dec!(1));
        assert_eq!(Side::Short.sign(), dec!(-1));
    }
}
