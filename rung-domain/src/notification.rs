//! Structured notification bodies.
//!
//! The engine never formats human-readable messages; it emits typed events
//! and leaves rendering to whatever sink consumes them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{Side, Symbol};

/// Which order an `OrderFailed` notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderScope {
    /// Entry market order
    Entry,
    /// One take-profit rung
    TakeProfit,
    /// Stop order
    StopLoss,
    /// Closing market order
    Exit,
}

/// Notification events emitted over a position lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    /// An actionable signal was accepted for dispatch
    SignalReceived {
        /// Symbol the signal targets
        symbol: Symbol,
        /// Requested direction
        side: Side,
        /// Identity of the accepted signal
        signal_id: Uuid,
        /// When the event was emitted
        at: DateTime<Utc>,
    },

    /// The entry market order was accepted by the exchange
    OrderSent {
        /// Symbol of the entry
        symbol: Symbol,
        /// Position direction
        side: Side,
        /// Exchange order id of the entry
        order_id: String,
        /// When the event was emitted
        at: DateTime<Utc>,
    },

    /// An order was rejected, or could not be sized
    OrderFailed {
        /// Symbol the order was for
        symbol: Symbol,
        /// Position direction
        side: Side,
        /// Which order in the lifecycle failed
        scope: OrderScope,
        /// Exchange message or sizing reason
        reason: String,
        /// When the event was emitted
        at: DateTime<Utc>,
    },

    /// First fill observed by the reconciler
    PositionFilled {
        /// Symbol of the position
        symbol: Symbol,
        /// Position direction
        side: Side,
        /// Captured entry price
        entry_price: Decimal,
        /// Held contracts
        contracts: Decimal,
        /// Held volume in base units
        vol_assets: Decimal,
        /// Planned take-profit levels, informational
        tp_prices: Vec<Decimal>,
        /// Initial stop level, informational
        sl_price: Option<Decimal>,
        /// When the event was emitted
        at: DateTime<Utc>,
    },

    /// The stop order was moved after ladder progress
    StopMoved {
        /// Symbol of the position
        symbol: Symbol,
        /// Position direction
        side: Side,
        /// Progress value the stop now trails
        rung: usize,
        /// New trigger price
        stop_price: Decimal,
        /// When the event was emitted
        at: DateTime<Utc>,
    },

    /// Every ladder rung was reached; the slot will be reset
    LifecycleComplete {
        /// Symbol of the position
        symbol: Symbol,
        /// Position direction
        side: Side,
        /// When the event was emitted
        at: DateTime<Utc>,
    },

    /// Realized result of a closed position
    ClosingReport {
        /// Symbol of the closed position
        symbol: Symbol,
        /// Position direction
        side: Side,
        /// Summed realized PnL in quote units
        realized_pnl: Decimal,
        /// PnL relative to the committed margin, percent
        profit_pct: Decimal,
        /// Time in deal, human-formatted
        time_in_deal: String,
        /// When the event was emitted
        at: DateTime<Utc>,
    },
}

/// Format a duration for closing reports: `2h 5m`, `3m 20s` or `45s`.
pub fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (hours, mins) = (secs / 3600, (secs % 3600) / 60);
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_notification_serialization() {
        let event = Notification::ClosingReport {
            symbol: Symbol::from_pair("BTC_USDT").unwrap(),
            side: Side::Long,
            realized_pnl: dec!(5.25),
            profit_pct: dec!(10.5),
            time_in_deal: "3m 20s".to_string(),
            at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }

    #[test]
    fn test_order_failed_serialization() {
        let event = Notification::OrderFailed {
            symbol: Symbol::from_pair("ETH_USDT").unwrap(),
            side: Side::Short,
            scope: OrderScope::TakeProfit,
            reason: "rung 2 sized to zero contracts".to_string(),
            at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(45)), "45s");
        assert_eq!(format_duration(Duration::seconds(200)), "3m 20s");
        assert_eq!(format_duration(Duration::seconds(7500)), "2h 5m");
        assert_eq!(format_duration(Duration::seconds(3600)), "1h 0m");
    }

    #[test]
    fn test_format_duration_negative_clamps_to_zero() {
        assert_eq!(format_duration(Duration::seconds(-5)), "0s");
    }
}
