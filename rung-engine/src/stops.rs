//! Trailing stop levels.
//!
//! Derives the stop trigger price from ladder progress. The level list is
//! `[entry] ++ tp_prices`; progress N means rung N-1 has been reached, so
//! the fixed-offset mode hangs the stop off level N while break-even mode
//! parks it exactly on level N-1.

use rust_decimal::Decimal;

use rung_domain::{Side, StopMode, SymbolSpec, TriggerDirection};

use crate::error::{EngineError, EngineResult};

/// Trigger direction for a stop order closing this side.
///
/// A stop closing a Long fires when price falls to the trigger; closing a
/// Short fires when price rises to it.
pub fn stop_trigger(side: Side) -> TriggerDirection {
    match side {
        Side::Long => TriggerDirection::AtOrBelow,
        Side::Short => TriggerDirection::AtOrAbove,
    }
}

/// Trigger direction for a take-profit order closing this side.
pub fn profit_trigger(side: Side) -> TriggerDirection {
    match side {
        Side::Long => TriggerDirection::AtOrAbove,
        Side::Short => TriggerDirection::AtOrBelow,
    }
}

/// Compute the stop trigger price for the current ladder progress.
///
/// Fixed-offset mode (and either mode at progress 0) offsets the reached
/// level against the position: `level x (1 - sign x |base_offset|/100)`.
/// Break-even mode returns the level one rung behind progress exactly.
/// Indexes are clamped to the level list in both modes.
///
/// # Errors
/// Returns `EngineError::InvalidEntryPrice` when the entry price is not
/// positive.
pub fn next_stop_price(
    spec: &SymbolSpec,
    side: Side,
    mode: StopMode,
    base_offset_pct: Decimal,
    entry_price: Decimal,
    tp_prices: &[Decimal],
    progress: usize,
) -> EngineResult<Decimal> {
    if entry_price <= Decimal::ZERO {
        return Err(EngineError::InvalidEntryPrice(entry_price.to_string()));
    }

    let mut levels = Vec::with_capacity(tp_prices.len() + 1);
    levels.push(entry_price);
    levels.extend_from_slice(tp_prices);
    let last = levels.len() - 1;

    let price = match mode {
        StopMode::BreakEvenLadder if progress > 0 => levels[(progress - 1).min(last)],
        _ => {
            let level = levels[progress.min(last)];
            level * (Decimal::ONE - side.sign() * base_offset_pct.abs() / Decimal::ONE_HUNDRED)
        }
    };

    Ok(spec.round_price(price))
}

// =============================================================================
// Tests
// =============================================================================
