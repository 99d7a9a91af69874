//! Exit execution.
//!
//! Flattens a position and clears its working orders. Closing is
//! best-effort: a failed market close must not stop the cancellations
//! behind it, the reconciler will observe whatever is left and try again
//! on the next cycle.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use rung_domain::{PositionRecord, Quantity};

use crate::outcome::OrderOutcome;
use crate::ports::ExchangeGateway;

/// Closes positions and clears their order ladders.
pub struct ExitExecutor<G> {
    gateway: Arc<G>,
}

impl<G: ExchangeGateway> ExitExecutor<G> {
    /// Create an exit executor.
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Flatten the position and cancel everything still working on it.
    ///
    /// Runs all three steps regardless of individual failures: market
    /// close (when contracts remain), stop cancellation (when a stop is
    /// tracked), then cancel-all as the sweep.
    pub async fn close_position(&self, record: &PositionRecord) {
        let symbol = &record.symbol;
        let side = record.side;

        if record.contracts > Decimal::ZERO {
            match Quantity::new(record.contracts) {
                Ok(contracts) => {
                    let outcome = OrderOutcome::from_result(
                        self.gateway
                            .place_market_order(
                                symbol,
                                side.exit_action(),
                                contracts,
                                record.leverage,
                                true,
                            )
                            .await,
                    );
                    if outcome.success {
                        info!(%symbol, %side, contracts = %record.contracts, "Close order accepted");
                    } else {
                        warn!(%symbol, %side, reason = outcome.reason(), "Close order rejected");
                    }
                }
                Err(e) => warn!(%symbol, %side, error = %e, "Close skipped, bad quantity"),
            }
        }

        if let Some(sl_order_id) = &record.sl_order_id {
            let outcome =
                OrderOutcome::from_result(self.gateway.cancel_order(symbol, sl_order_id).await);
            if !outcome.success {
                warn!(%symbol, %side, order_id = %sl_order_id, reason = outcome.reason(), "Stop cancel rejected");
            }
        }

        let outcome = OrderOutcome::from_result(self.gateway.cancel_all_orders(symbol).await);
        if !outcome.success {
            warn!(%symbol, %side, reason = outcome.reason(), "Cancel-all rejected");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
