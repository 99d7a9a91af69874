//! Ladder progress detection.
//!
//! Progress is inferred from the tracked ladder orders alone: the
//! furthest rung whose order is no longer simply resting on the book.
//! "Furthest" means highest price for a Long and lowest for a Short.

use std::collections::HashMap;

use rust_decimal::Decimal;

use rung_domain::{OpenOrder, Side};

/// The furthest reached rung found by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressScan {
    /// Exchange order id of the reached rung
    pub order_id: String,
    /// Zero-based rung index
    pub rung: usize,
    /// Limit price of that rung
    pub price: Decimal,
}

/// Scan tracked ladder orders for the furthest reached rung.
///
/// Orders only count once the stream has reported a state, and only when
/// that state marks the rung as reached (not resting, not cancelled) and
/// a positive price was recorded. Returns None when no rung qualifies.
pub fn scan_progress(orders: &HashMap<String, OpenOrder>, side: Side) -> Option<ProgressScan> {
    let candidates = orders.iter().filter(|(_, order)| {
        order.price > Decimal::ZERO
            && order.state.map(|s| s.counts_for_progress()).unwrap_or(false)
    });

    let best = match side {
        Side::Long => candidates.max_by(|a, b| a.1.price.cmp(&b.1.price)),
        Side::Short => candidates.min_by(|a, b| a.1.price.cmp(&b.1.price)),
    };

    best.map(|(order_id, order)| ProgressScan {
        order_id: order_id.clone(),
        rung: order.rung,
        price: order.price,
    })
}

/// Progress value implied by a scan: reached rung index + 1, or 0 when
/// nothing has been reached yet.
pub fn progress_of(scan: Option<&ProgressScan>) -> usize {
    scan.map(|s| s.rung + 1).unwrap_or(0)
}

// =============================================================================
// Tests
// =============================================================================
