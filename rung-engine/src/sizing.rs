//! Entry sizing.
//!
//! Converts session margin and leverage into a contract quantity for one
//! instrument, applying the capital-tier multiplier first.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use rung_domain::{SymbolSpec, TierTable, TierTarget};

/// Margin and leverage after the tier multiplier has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizedEntry {
    /// Margin committed to the entry, quote units
    pub margin_size: Decimal,
    /// Leverage for the entry
    pub leverage: u32,
}

/// Apply the capital-tier multiplier to margin or leverage.
///
/// Leverage results are truncated to an integer and never drop below 1.
pub fn apply_tier(
    tiers: &TierTable,
    target: TierTarget,
    cap: Decimal,
    margin_size: Decimal,
    leverage: u32,
) -> SizedEntry {
    let multiplier = tiers.resolve(cap);
    match target {
        TierTarget::Margin => SizedEntry {
            margin_size: margin_size * multiplier,
            leverage,
        },
        TierTarget::Leverage => {
            let scaled = (Decimal::from(leverage) * multiplier)
                .trunc()
                .to_u32()
                .unwrap_or(leverage);
            SizedEntry {
                margin_size,
                leverage: scaled.max(1),
            }
        }
    }
}

/// Contract quantity for a share of the nominal volume.
///
/// `nominal = margin x volume_pct / 100 x leverage`; the quantity is
/// `nominal / price / contract_size`, floored to the lot step and
/// truncated to the quantity precision. Returns zero when the price is
/// non-positive or the result rounds below one lot.
pub fn contract_quantity(
    spec: &SymbolSpec,
    margin_size: Decimal,
    leverage: u32,
    price: Decimal,
    volume_pct: Decimal,
) -> Decimal {
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let nominal = margin_size * volume_pct / Decimal::ONE_HUNDRED * Decimal::from(leverage);
    let raw = nominal / price / spec.contract_size;
    spec.round_quantity(raw)
}

// =============================================================================
// Tests
// =============================================================================
