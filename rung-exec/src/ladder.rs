//! Ladder scheduling.
//!
//! Waits for the entry fill to land on the record, plans the take-profit
//! ladder and places it rung by rung with paced delays. One scheduler run
//! covers one lifecycle; the supervisor spawns it right after dispatch.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rung_domain::{Ladder, LifecycleState, Notification, OrderScope, Price, Quantity, Side, Symbol, SymbolSpec};
use rung_engine::{pacing_delays, plan_ladder, PacingConfig};
use rust_decimal::Decimal;
use rung_store::RecordHandle;

use crate::error::{ExecError, ExecResult};
use crate::notify::Notifier;
use crate::outcome::OrderOutcome;
use crate::ports::ExchangeGateway;

/// Scheduler timing parameters.
#[derive(Debug, Clone)]
pub struct LadderConfig {
    /// Pacing between rung placements
    pub pacing: PacingConfig,
    /// How long to wait for the entry fill before giving up
    pub entry_wait: Duration,
    /// Poll interval while waiting for the fill
    pub entry_poll: Duration,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            pacing: PacingConfig::default(),
            entry_wait: Duration::from_secs(30),
            entry_poll: Duration::from_millis(150),
        }
    }
}

/// Everything the placement loop needs, captured under one lock hold.
struct FillSnapshot {
    symbol: Symbol,
    side: Side,
    spec: SymbolSpec,
    ladder: Ladder,
    entry_price: Decimal,
    contracts: Decimal,
}

/// Places the take-profit ladder once the entry fills.
pub struct LadderScheduler<G> {
    gateway: Arc<G>,
    notifier: Arc<dyn Notifier>,
    config: LadderConfig,
}

impl<G: ExchangeGateway> LadderScheduler<G> {
    /// Create a ladder scheduler.
    pub fn new(gateway: Arc<G>, notifier: Arc<dyn Notifier>, config: LadderConfig) -> Self {
        Self { gateway, notifier, config }
    }

    /// Wait for the fill, then place the whole ladder.
    ///
    /// # Errors
    /// `EntryWaitTimeout` when no fill appears within the configured wait,
    /// `Cancelled` on shutdown or when the slot goes back to Idle
    /// underneath us.
    pub async fn place_ladder(
        &self,
        handle: &RecordHandle,
        token: &CancellationToken,
    ) -> ExecResult<()> {
        let snapshot = self.wait_for_fill(handle, token).await?;
        let plan = plan_ladder(
            &snapshot.spec,
            snapshot.side,
            &snapshot.ladder,
            snapshot.entry_price,
            snapshot.contracts,
        )?;

        for index in &plan.skipped {
            debug!(
                symbol = %snapshot.symbol,
                side = %snapshot.side,
                rung = index,
                "Rung sized to zero contracts, skipped"
            );
            self.notifier
                .notify(Notification::OrderFailed {
                    symbol: snapshot.symbol.clone(),
                    side: snapshot.side,
                    scope: OrderScope::TakeProfit,
                    reason: format!("rung {} sized to zero contracts", index),
                    at: Utc::now(),
                })
                .await;
        }

        // Thread rng is not Send; materialize every delay before the
        // placement loop awaits anything.
        let delays = {
            let mut rng = rand::thread_rng();
            pacing_delays(&self.config.pacing, plan.rungs.len(), &mut rng)
        };

        for (rung, delay) in plan.rungs.iter().zip(delays) {
            let outcome = OrderOutcome::from_result(
                self.gateway
                    .place_limit_order(
                        &snapshot.symbol,
                        snapshot.side.exit_action(),
                        Quantity::new(rung.quantity)?,
                        Price::new(rung.price)?,
                    )
                    .await,
            );

            if outcome.success {
                let order_id = outcome.order_id.unwrap_or_default();
                info!(
                    symbol = %snapshot.symbol,
                    side = %snapshot.side,
                    rung = rung.index,
                    price = %rung.price,
                    quantity = %rung.quantity,
                    %order_id,
                    "Ladder rung placed"
                );
                handle
                    .lock()
                    .await
                    .record_rung_order(order_id, rung.index, rung.price);
            } else {
                warn!(
                    symbol = %snapshot.symbol,
                    side = %snapshot.side,
                    rung = rung.index,
                    reason = outcome.reason(),
                    "Ladder rung rejected"
                );
                self.notifier
                    .notify(Notification::OrderFailed {
                        symbol: snapshot.symbol.clone(),
                        side: snapshot.side,
                        scope: OrderScope::TakeProfit,
                        reason: outcome.reason().to_string(),
                        at: Utc::now(),
                    })
                    .await;
            }

            tokio::select! {
                _ = token.cancelled() => return Err(ExecError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let mut record = handle.lock().await;
        if record.state == LifecycleState::Open {
            record.transition(LifecycleState::LadderActive)?;
        }
        Ok(())
    }

    /// Poll the record until the reconciler has captured the entry fill.
    async fn wait_for_fill(
        &self,
        handle: &RecordHandle,
        token: &CancellationToken,
    ) -> ExecResult<FillSnapshot> {
        let deadline = Instant::now() + self.config.entry_wait;
        loop {
            {
                let mut record = handle.lock().await;
                if record.force_reset || record.state == LifecycleState::Idle {
                    return Err(ExecError::Cancelled);
                }
                if let (Some(entry_price), Some(ladder)) = (record.entry_price, record.ladder.clone()) {
                    if record.contracts > Decimal::ZERO {
                        return Ok(FillSnapshot {
                            symbol: record.symbol.clone(),
                            side: record.side,
                            spec: record.spec.clone(),
                            ladder,
                            entry_price,
                            contracts: record.contracts,
                        });
                    }
                }

                if Instant::now() >= deadline {
                    let symbol = record.symbol.clone();
                    let side = record.side;
                    warn!(%symbol, %side, "Entry fill never observed, abandoning ladder");
                    if record.state == LifecycleState::PendingEntry {
                        record.reset();
                    }
                    self.notifier
                        .notify(Notification::OrderFailed {
                            symbol: symbol.clone(),
                            side,
                            scope: OrderScope::TakeProfit,
                            reason: "entry fill never observed".to_string(),
                            at: Utc::now(),
                        })
                        .await;
                    return Err(ExecError::EntryWaitTimeout(format!("{}:{}", symbol, side)));
                }
            }

            tokio::select! {
                _ = token.cancelled() => return Err(ExecError::Cancelled),
                _ = tokio::time::sleep(self.config.entry_poll) => {}
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
