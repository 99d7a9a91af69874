//! Ladder planning.
//!
//! Turns a validated ladder, an entry price and a contract total into the
//! exact sequence of limit orders to place. Quantities are computed
//! sequentially against the remaining volume, so rounding losses
//! accumulate into the final rung, which always takes everything left.

use rust_decimal::Decimal;

use rung_domain::{Ladder, Side, SymbolSpec};

use crate::error::{EngineError, EngineResult};

/// One limit order the scheduler should place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PlannedRung {
    /// Zero-based rung index
    pub index: usize,
    /// Contracts to place at this rung
    pub quantity: Decimal,
    /// Limit price, snapped to the instrument's price precision
    pub price: Decimal,
}

/// The full ladder plan.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LadderPlan {
    /// Rungs to place, ascending index order
    pub rungs: Vec<PlannedRung>,
    /// Rung indexes whose share rounded to zero contracts
    pub skipped: Vec<usize>,
}

/// Offset a ladder rung price from entry: `entry x (1 + sign x offset/100)`.
pub fn rung_price(spec: &SymbolSpec, side: Side, entry_price: Decimal, offset_pct: Decimal) -> Decimal {
    let factor = Decimal::ONE + side.sign() * offset_pct / Decimal::ONE_HUNDRED;
    spec.round_price(entry_price * factor)
}

/// Plan the take-profit ladder for a filled position.
///
/// Every rung but the last takes `volume_pct` percent of the volume still
/// remaining; the last rung takes all of it. A rung whose quantity snaps
/// to zero is skipped without touching the remainder.
///
/// # Errors
/// Returns `EngineError::InvalidEntryPrice` when the entry price is not
/// positive.
pub fn plan_ladder(
    spec: &SymbolSpec,
    side: Side,
    ladder: &Ladder,
    entry_price: Decimal,
    total_contracts: Decimal,
) -> EngineResult<LadderPlan> {
    if entry_price <= Decimal::ZERO {
        return Err(EngineError::InvalidEntryPrice(entry_price.to_string()));
    }

    let steps = ladder.steps();
    let mut remaining = total_contracts;
    let mut rungs = Vec::with_capacity(steps.len());
    let mut skipped = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        let is_last = index + 1 == steps.len();
        let quantity = if is_last {
            spec.round_quantity(remaining)
        } else {
            spec.round_quantity(remaining * step.volume_pct / Decimal::ONE_HUNDRED)
        };

        if quantity <= Decimal::ZERO {
            skipped.push(index);
            continue;
        }

        rungs.push(PlannedRung {
            index,
            quantity,
            price: rung_price(spec, side, entry_price, step.offset_pct),
        });
        remaining -= quantity;
    }

    Ok(LadderPlan { rungs, skipped })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rung_domain::{LadderStep, Symbol};
    use rust_decimal_macros::dec;

    fn spec() -> SymbolSpec {
        SymbolSpec::new(
            Symbol::from_pair("BTC_USDT").unwrap(),
            dec!(0.0001),
            dec!(1),
            0,
            1,
            125,
        )
        .unwrap()
    }

    fn ladder(steps: &[(Decimal, Decimal)]) -> Ladder {
        Ladder::new(
            steps
                .iter()
                .map(|&(offset_pct, volume_pct)| LadderStep { offset_pct, volume_pct })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_plan_three_rung_ladder() {
        // Entry 100 LONG, ladder (3%,20) (7%,20) (10%,60), 10 contracts.
        let plan = plan_ladder(
            &spec(),
            Side::Long,
            &ladder(&[(dec!(3), dec!(20)), (dec!(7), dec!(20)), (dec!(10), dec!(60))]),
            dec!(100),
            dec!(10),
        )
        .unwrap();

        assert!(plan.skipped.is_empty());
        let qty: Vec<Decimal> = plan.rungs.iter().map(|r| r.quantity).collect();
        let px: Vec<Decimal> = plan.rungs.iter().map(|r| r.price).collect();
        assert_eq!(qty, vec![dec!(2), dec!(2), dec!(6)]);
        assert_eq!(px, vec![dec!(103), dec!(107), dec!(110)]);
    }

    #[test]
    fn test_plan_conserves_total() {
        let plan = plan_ladder(
            &spec(),
            Side::Long,
            &ladder(&[(dec!(2), dec!(30)), (dec!(5), dec!(30)), (dec!(9), dec!(40))]),
            dec!(250),
            dec!(17),
        )
        .unwrap();
        let placed: Decimal = plan.rungs.iter().map(|r| r.quantity).sum();
        assert_eq!(placed, dec!(17));
    }

    #[test]
    fn test_plan_short_prices_below_entry() {
        let plan = plan_ladder(
            &spec(),
            Side::Short,
            &ladder(&[(dec!(3), dec!(50)), (dec!(7), dec!(50))]),
            dec!(100),
            dec!(10),
        )
        .unwrap();
        let px: Vec<Decimal> = plan.rungs.iter().map(|r| r.price).collect();
        assert_eq!(px, vec![dec!(97), dec!(93)]);
    }

    #[test]
    fn test_plan_skips_zero_quantity_rungs() {
        // 3 contracts at 20% -> 0.6 -> floors to 0; skipped without
        // touching the remainder, final rung takes all 3.
        let plan = plan_ladder(
            &spec(),
            Side::Long,
            &ladder(&[(dec!(3), dec!(20)), (dec!(7), dec!(20)), (dec!(10), dec!(60))]),
            dec!(100),
            dec!(3),
        )
        .unwrap();
        assert_eq!(plan.skipped, vec![0, 1]);
        assert_eq!(plan.rungs.len(), 1);
        assert_eq!(plan.rungs[0].index, 2);
        assert_eq!(plan.rungs[0].quantity, dec!(3));
    }

    #[test]
    fn test_plan_zero_total_skips_everything() {
        let plan = plan_ladder(
            &spec(),
            Side::Long,
            &ladder(&[(dec!(3), dec!(50)), (dec!(7), dec!(50))]),
            dec!(100),
            dec!(0),
        )
        .unwrap();
        assert!(plan.rungs.is_empty());
        assert_eq!(plan.skipped, vec![0, 1]);
    }

    #[test]
    fn test_plan_rejects_bad_entry_price() {
        let result = plan_ladder(
            &spec(),
            Side::Long,
            &ladder(&[(dec!(3), dec!(100))]),
            dec!(0),
            dec!(10),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rung_price_precision() {
        let s = SymbolSpec::new(
            Symbol::from_pair("ETH_USDT").unwrap(),
            dec!(0.01),
            dec!(1),
            0,
            2,
            100,
        )
        .unwrap();
        // 1234.56 x 1.03 = 1271.5968 -> 1271.60
        assert_eq!(rung_price(&s, Side::Long, dec!(1234.56), dec!(3)), dec!(1271.60));
    }
}
