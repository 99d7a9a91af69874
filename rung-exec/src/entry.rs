//! Entry execution.
//!
//! Sizes and submits the entry market order for a dispatched signal.
//! Failures are expected outcomes here: the executor reports them through
//! notifications and puts the slot back to Idle instead of erroring the
//! caller.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use rung_domain::{LifecycleState, Notification, OrderScope, Quantity, TierTable, TierTarget};
use rung_engine::{apply_tier, contract_quantity};
use rung_store::RecordHandle;

use crate::error::ExecResult;
use crate::notify::Notifier;
use crate::outcome::OrderOutcome;
use crate::ports::ExchangeGateway;

/// Session sizing parameters for entries.
#[derive(Debug, Clone)]
pub struct EntryConfig {
    /// Margin committed per position, quote units
    pub margin_size: Decimal,
    /// Requested leverage; capped by the instrument's maximum
    pub leverage: u32,
    /// What the capital-tier multiplier scales
    pub tier_target: TierTarget,
    /// Capital-tier table
    pub tiers: TierTable,
}

/// Opens positions from accepted signals.
pub struct EntryExecutor<G> {
    gateway: Arc<G>,
    notifier: Arc<dyn Notifier>,
    config: EntryConfig,
}

impl<G: ExchangeGateway> EntryExecutor<G> {
    /// Create an entry executor.
    pub fn new(gateway: Arc<G>, notifier: Arc<dyn Notifier>, config: EntryConfig) -> Self {
        Self { gateway, notifier, config }
    }

    /// Size and submit the entry market order for a slot.
    ///
    /// Returns `Ok(true)` when the order was accepted, `Ok(false)` when
    /// the entry was abandoned (sizing came out empty, or the exchange
    /// rejected the order); abandoned entries leave the slot Idle again.
    pub async fn open_position(&self, handle: &RecordHandle, cap: Decimal) -> ExecResult<bool> {
        let mut record = handle.lock().await;
        let symbol = record.symbol.clone();
        let side = record.side;

        let leverage = self.config.leverage.min(record.spec.max_leverage);
        let sized = apply_tier(
            &self.config.tiers,
            self.config.tier_target,
            cap,
            self.config.margin_size,
            leverage,
        );

        record.transition(LifecycleState::PendingEntry)?;

        let price = match self.gateway.fair_price(&symbol).await {
            Ok(price) => price.as_decimal(),
            Err(e) => {
                warn!(%symbol, %side, error = %e, "Entry abandoned, no fair price");
                record.transition(LifecycleState::Idle)?;
                self.notifier
                    .notify(Notification::OrderFailed {
                        symbol,
                        side,
                        scope: OrderScope::Entry,
                        reason: e.to_string(),
                        at: Utc::now(),
                    })
                    .await;
                return Ok(false);
            }
        };

        let contracts = contract_quantity(
            &record.spec,
            sized.margin_size,
            sized.leverage,
            price,
            Decimal::ONE_HUNDRED,
        );
        if contracts <= Decimal::ZERO {
            warn!(%symbol, %side, %price, "Entry abandoned, sized to zero contracts");
            record.transition(LifecycleState::Idle)?;
            self.notifier
                .notify(Notification::OrderFailed {
                    symbol,
                    side,
                    scope: OrderScope::Entry,
                    reason: "sized to zero contracts".to_string(),
                    at: Utc::now(),
                })
                .await;
            return Ok(false);
        }

        record.margin_size = sized.margin_size;
        record.leverage = sized.leverage;

        let outcome = OrderOutcome::from_result(
            self.gateway
                .place_market_order(
                    &symbol,
                    side.entry_action(),
                    Quantity::new(contracts)?,
                    sized.leverage,
                    false,
                )
                .await,
        );

        if outcome.success {
            info!(
                %symbol,
                %side,
                %contracts,
                leverage = sized.leverage,
                order_id = outcome.order_id.as_deref().unwrap_or(""),
                "Entry order accepted"
            );
            self.notifier
                .notify(Notification::OrderSent {
                    symbol,
                    side,
                    order_id: outcome.order_id.unwrap_or_default(),
                    at: Utc::now(),
                })
                .await;
            Ok(true)
        } else {
            warn!(%symbol, %side, reason = outcome.reason(), "Entry order rejected");
            record.transition(LifecycleState::Idle)?;
            self.notifier
                .notify(Notification::OrderFailed {
                    symbol,
                    side,
                    scope: OrderScope::Entry,
                    reason: outcome.reason().to_string(),
                    at: Utc::now(),
                })
                .await;
            Ok(false)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
