//! Position records and the lifecycle state machine.
//!
//! A `PositionRecord` is the authoritative in-memory state for one
//! (symbol, side) slot: lifecycle state, sizing fields, the live ladder
//! orders and the current stop order. The reconciler, ladder scheduler and
//! stop controller all mutate the record through its store handle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::instrument::SymbolSpec;
use crate::ladder::Ladder;
use crate::value_objects::{DomainError, Side, Symbol};

// =============================================================================
// Order state
// =============================================================================

/// Exchange-reported state of a ladder order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Accepted but not yet acknowledged on the book
    Placed,
    /// Resting on the book, untouched
    Working,
    /// Fully filled (or triggered)
    Filled,
    /// Cancelled
    Cancelled,
    /// Rejected or otherwise invalidated
    Invalid,
}

impl OrderState {
    /// Map the exchange's numeric order state.
    pub fn from_exchange_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(OrderState::Placed),
            2 => Some(OrderState::Working),
            3 => Some(OrderState::Filled),
            4 => Some(OrderState::Cancelled),
            5 => Some(OrderState::Invalid),
            _ => None,
        }
    }

    /// Whether an order in this state marks its rung as reached.
    ///
    /// Orders still resting untouched on the book and cancelled orders do
    /// not count; anything else (filled, triggered, invalidated) means the
    /// market traded through that rung.
    pub fn counts_for_progress(&self) -> bool {
        !matches!(self, OrderState::Working | OrderState::Cancelled)
    }
}

/// A ladder order tracked on the record, keyed by exchange order id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    /// Zero-based rung index this order covers
    pub rung: usize,
    /// Limit price the order was placed at
    pub price: Decimal,
    /// Last state reported by the order-update stream; None until the
    /// first update arrives
    pub state: Option<OrderState>,
}

// =============================================================================
// Lifecycle state
// =============================================================================

/// Explicit position lifecycle.
///
/// ```text
/// Idle → PendingEntry → Open → LadderActive → Closing → Idle
/// ```
///
/// `Idle → Open` covers positions discovered on the exchange that this
/// process did not open (preexisting). A failed entry goes back from
/// PendingEntry to Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// No position, slot available
    Idle,
    /// Entry order sent, fill not yet observed
    PendingEntry,
    /// Position held, ladder not yet placed
    Open,
    /// Ladder placed, stop supervision running
    LadderActive,
    /// Reset in flight (report, exit, field reset)
    Closing,
}

impl LifecycleState {
    /// Transition table. Exhaustive on the source state.
    pub fn can_transition(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match self {
            Idle => matches!(next, PendingEntry | Open),
            PendingEntry => matches!(next, Open | Idle),
            Open => matches!(next, LadderActive | Closing),
            LadderActive => matches!(next, Closing),
            Closing => matches!(next, Idle),
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::PendingEntry => "pending-entry",
            LifecycleState::Open => "open",
            LifecycleState::LadderActive => "ladder-active",
            LifecycleState::Closing => "closing",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Position record
// =============================================================================

/// Authoritative state for one (symbol, side) position slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Symbol this slot trades
    pub symbol: Symbol,
    /// Position direction (hedge mode: Long and Short are separate slots)
    pub side: Side,
    /// Instrument spec captured when the slot was created
    pub spec: SymbolSpec,

    /// Lifecycle state
    pub state: LifecycleState,
    /// Position existed on the exchange before this process touched it
    pub preexisting: bool,
    /// Ladder completed, reconciler must run the reset path
    pub force_reset: bool,
    /// Reset path is running; re-entry is skipped
    pub reset_in_progress: bool,
    /// First stop order has been placed
    pub sl_initiated: bool,

    /// Entry price captured on the first observed fill
    pub entry_price: Option<Decimal>,
    /// Latest exchange-reported hold price
    pub hold_price: Option<Decimal>,
    /// Held contracts
    pub contracts: Decimal,
    /// Held volume in base units (contracts x contract size)
    pub vol_assets: Decimal,
    /// Margin committed at entry
    pub margin_size: Decimal,
    /// Leverage used for the entry
    pub leverage: u32,

    /// Ladder chosen for this lifecycle (None for preexisting positions)
    pub ladder: Option<Ladder>,
    /// Prices of successfully placed ladder orders, rung order
    pub tp_prices: Vec<Decimal>,
    /// Live ladder orders by exchange order id
    pub open_orders: HashMap<String, OpenOrder>,
    /// Live stop order id, at most one
    pub sl_order_id: Option<String>,
    /// Trigger price of the live stop order
    pub sl_price: Option<Decimal>,
    /// Highest rung reached so far (monotonically non-decreasing)
    pub progress: usize,

    /// When the first fill was observed
    pub opened_at: Option<DateTime<Utc>>,
    /// Last time a closing report was emitted (debounce)
    pub last_report_at: Option<DateTime<Utc>>,
}

impl PositionRecord {
    /// Create an idle record for a slot.
    pub fn new(symbol: Symbol, side: Side, spec: SymbolSpec) -> Self {
        Self {
            symbol,
            side,
            spec,
            state: LifecycleState::Idle,
            preexisting: false,
            force_reset: false,
            reset_in_progress: false,
            sl_initiated: false,
            entry_price: None,
            hold_price: None,
            contracts: Decimal::ZERO,
            vol_assets: Decimal::ZERO,
            margin_size: Decimal::ZERO,
            leverage: 0,
            ladder: None,
            tp_prices: Vec::new(),
            open_orders: HashMap::new(),
            sl_order_id: None,
            sl_price: None,
            progress: 0,
            opened_at: None,
            last_report_at: None,
        }
    }

    /// Apply a checked lifecycle transition.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidStateTransition` when the transition
    /// table forbids the move.
    pub fn transition(&mut self, next: LifecycleState) -> Result<(), DomainError> {
        if !self.state.can_transition(next) {
            return Err(DomainError::InvalidStateTransition(format!(
                "{} -> {} ({} {})",
                self.state, next, self.symbol, self.side
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Whether the record believes a position is held.
    pub fn in_position(&self) -> bool {
        matches!(self.state, LifecycleState::Open | LifecycleState::LadderActive)
    }

    /// Record a successfully placed ladder order.
    pub fn record_rung_order(&mut self, order_id: String, rung: usize, price: Decimal) {
        self.open_orders.insert(order_id, OpenOrder { rung, price, state: None });
        self.tp_prices.push(price);
    }

    /// Apply an order-update stream event. Unknown order ids are ignored.
    pub fn apply_order_update(&mut self, order_id: &str, state: OrderState) {
        if let Some(order) = self.open_orders.get_mut(order_id) {
            order.state = Some(state);
        }
    }

    /// Reset every lifecycle field back to defaults, keeping the slot
    /// identity (symbol, side, spec). Runs unconditionally at the end of
    /// the reset path, whatever happened before it.
    pub fn reset(&mut self) {
        let last_report_at = self.last_report_at;
        *self = Self::new(self.symbol.clone(), self.side, self.spec.clone());
        // Debounce state survives the reset so a bouncing snapshot cannot
        // produce a second report.
        self.last_report_at = last_report_at;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record() -> PositionRecord {
        let symbol = Symbol::from_pair("BTC_USDT").unwrap();
        let spec = SymbolSpec::new(symbol.clone(), dec!(0.0001), dec!(1), 0, 1, 125).unwrap();
        PositionRecord::new(symbol, Side::Long, spec)
    }

    #[test]
    fn test_order_state_from_code() {
        assert_eq!(OrderState::from_exchange_code(1), Some(OrderState::Placed));
        assert_eq!(OrderState::from_exchange_code(2), Some(OrderState::Working));
        assert_eq!(OrderState::from_exchange_code(3), Some(OrderState::Filled));
        assert_eq!(OrderState::from_exchange_code(4), Some(OrderState::Cancelled));
        assert_eq!(OrderState::from_exchange_code(5), Some(OrderState::Invalid));
        assert_eq!(OrderState::from_exchange_code(9), None);
    }

    #[test]
    fn test_order_state_progress_filter() {
        assert!(OrderState::Placed.counts_for_progress());
        assert!(OrderState::Filled.counts_for_progress());
        assert!(OrderState::Invalid.counts_for_progress());
        assert!(!OrderState::Working.counts_for_progress());
        assert!(!OrderState::Cancelled.counts_for_progress());
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let mut r = record();
        r.transition(LifecycleState::PendingEntry).unwrap();
        r.transition(LifecycleState::Open).unwrap();
        r.transition(LifecycleState::LadderActive).unwrap();
        r.transition(LifecycleState::Closing).unwrap();
        r.transition(LifecycleState::Idle).unwrap();
    }

    #[test]
    fn test_lifecycle_failed_entry() {
        let mut r = record();
        r.transition(LifecycleState::PendingEntry).unwrap();
        r.transition(LifecycleState::Idle).unwrap();
        assert_eq!(r.state, LifecycleState::Idle);
    }

    #[test]
    fn test_lifecycle_preexisting_adoption() {
        let mut r = record();
        r.transition(LifecycleState::Open).unwrap();
        assert!(r.in_position());
    }

    #[test]
    fn test_lifecycle_rejects_invalid_transitions() {
        let mut r = record();
        assert!(r.transition(LifecycleState::LadderActive).is_err());
        assert!(r.transition(LifecycleState::Closing).is_err());

        r.transition(LifecycleState::PendingEntry).unwrap();
        assert!(r.transition(LifecycleState::LadderActive).is_err());

        r.transition(LifecycleState::Open).unwrap();
        r.transition(LifecycleState::LadderActive).unwrap();
        // Ladder can only unwind through Closing
        assert!(r.transition(LifecycleState::Open).is_err());
        assert!(r.transition(LifecycleState::Idle).is_err());
    }

    #[test]
    fn test_in_position() {
        let mut r = record();
        assert!(!r.in_position());
        r.transition(LifecycleState::PendingEntry).unwrap();
        assert!(!r.in_position());
        r.transition(LifecycleState::Open).unwrap();
        assert!(r.in_position());
        r.transition(LifecycleState::Closing).unwrap();
        assert!(!r.in_position());
    }

    #[test]
    fn test_record_rung_order_and_updates() {
        let mut r = record();
        r.record_rung_order("ord-1".to_string(), 0, dec!(103));
        r.record_rung_order("ord-2".to_string(), 1, dec!(107));

        assert_eq!(r.tp_prices, vec![dec!(103), dec!(107)]);
        assert_eq!(r.open_orders["ord-1"].state, None);

        r.apply_order_update("ord-1", OrderState::Filled);
        assert_eq!(r.open_orders["ord-1"].state, Some(OrderState::Filled));

        // Unknown order ids are ignored
        r.apply_order_update("ord-9", OrderState::Filled);
        assert_eq!(r.open_orders.len(), 2);
    }

    #[test]
    fn test_reset_restores_defaults_but_keeps_debounce() {
        let mut r = record();
        r.transition(LifecycleState::PendingEntry).unwrap();
        r.transition(LifecycleState::Open).unwrap();
        r.entry_price = Some(dec!(100));
        r.contracts = dec!(10);
        r.record_rung_order("ord-1".to_string(), 0, dec!(103));
        r.sl_order_id = Some("sl-1".to_string());
        r.force_reset = true;
        r.reset_in_progress = true;
        let reported = Utc::now();
        r.last_report_at = Some(reported);

        r.reset();

        assert_eq!(r.state, LifecycleState::Idle);
        assert_eq!(r.entry_price, None);
        assert_eq!(r.contracts, Decimal::ZERO);
        assert!(r.open_orders.is_empty());
        assert!(r.tp_prices.is_empty());
        assert_eq!(r.sl_order_id, None);
        assert!(!r.force_reset);
        assert!(!r.reset_in_progress);
        assert_eq!(r.progress, 0);
        assert_eq!(r.last_report_at, Some(reported));
    }
}
