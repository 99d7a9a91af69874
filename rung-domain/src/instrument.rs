//! Instrument specifications.
//!
//! Per-symbol contract metadata fetched from the exchange. Every quantity
//! and price the engine produces is snapped to these steps before an order
//! is submitted.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::value_objects::{DomainError, Symbol};

/// Contract metadata for one perpetual futures symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSpec {
    /// The symbol this spec describes
    pub symbol: Symbol,
    /// Base units represented by one contract
    pub contract_size: Decimal,
    /// Smallest tradable contract increment (lot step)
    pub vol_step: Decimal,
    /// Decimal places accepted for contract quantities
    pub quantity_precision: u32,
    /// Decimal places accepted for prices
    pub price_precision: u32,
    /// Maximum leverage the exchange allows for this symbol
    pub max_leverage: u32,
}

impl SymbolSpec {
    /// Create a spec with validation.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidInstrument` if contract size, lot step
    /// or max leverage is non-positive.
    pub fn new(
        symbol: Symbol,
        contract_size: Decimal,
        vol_step: Decimal,
        quantity_precision: u32,
        price_precision: u32,
        max_leverage: u32,
    ) -> Result<Self, DomainError> {
        if contract_size <= Decimal::ZERO {
            return Err(DomainError::InvalidInstrument(
                "Contract size must be positive".to_string(),
            ));
        }
        if vol_step <= Decimal::ZERO {
            return Err(DomainError::InvalidInstrument(
                "Lot step must be positive".to_string(),
            ));
        }
        if max_leverage == 0 {
            return Err(DomainError::InvalidInstrument(
                "Max leverage must be positive".to_string(),
            ));
        }
        Ok(Self {
            symbol,
            contract_size,
            vol_step,
            quantity_precision,
            price_precision,
            max_leverage,
        })
    }

    /// Snap a raw contract quantity to the lot step, then truncate to the
    /// quantity precision. Always rounds down so an order never exceeds the
    /// volume it was sized from.
    pub fn round_quantity(&self, raw: Decimal) -> Decimal {
        if raw <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let stepped = (raw / self.vol_step).floor() * self.vol_step;
        stepped.round_dp_with_strategy(self.quantity_precision, RoundingStrategy::ToZero)
    }

    /// Round a raw price to the price precision.
    pub fn round_price(&self, raw: Decimal) -> Decimal {
        raw.round_dp(self.price_precision)
    }
}

// =============================================================================
// Tests
// =============================================================================
