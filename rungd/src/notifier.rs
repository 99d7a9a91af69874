//! Logging notification sink.
//!
//! Renders lifecycle events into structured log lines. Production builds
//! would add a chat bridge behind the same trait; the daemon itself only
//! needs the events to be visible somewhere.

use async_trait::async_trait;
use tracing::{info, warn};

use rung_domain::Notification;
use rung_exec::Notifier;

/// Notifier that writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    /// Create a log notifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) {
        match notification {
            Notification::SignalReceived { symbol, side, signal_id, .. } => {
                info!(%symbol, %side, %signal_id, "Signal accepted");
            }
            Notification::OrderSent { symbol, side, order_id, .. } => {
                info!(%symbol, %side, %order_id, "Entry order sent");
            }
            Notification::OrderFailed { symbol, side, scope, reason, .. } => {
                warn!(%symbol, %side, ?scope, %reason, "Order failed");
            }
            Notification::PositionFilled {
                symbol,
                side,
                entry_price,
                contracts,
                vol_assets,
                ref tp_prices,
                sl_price,
                ..
            } => {
                info!(
                    %symbol,
                    %side,
                    %entry_price,
                    %contracts,
                    %vol_assets,
                    tp_prices = ?tp_prices,
                    sl_price = ?sl_price,
                    "Position filled"
                );
            }
            Notification::StopMoved { symbol, side, rung, stop_price, .. } => {
                info!(%symbol, %side, rung, %stop_price, "Stop moved");
            }
            Notification::LifecycleComplete { symbol, side, .. } => {
                info!(%symbol, %side, "Ladder complete");
            }
            Notification::ClosingReport {
                symbol,
                side,
                realized_pnl,
                profit_pct,
                ref time_in_deal,
                ..
            } => {
                info!(
                    %symbol,
                    %side,
                    %realized_pnl,
                    %profit_pct,
                    %time_in_deal,
                    "Position closed"
                );
            }
        }
    }
}
