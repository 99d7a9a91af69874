//! Stop supervision.
//!
//! One tick of the stop controller scans ladder progress, decides whether
//! the stop needs placing or moving, and does the cancel-then-replace
//! against the exchange. Everything happens under the record lock so the
//! reconciler cannot reset the slot mid-move.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use rung_domain::{Notification, OrderScope, Price, Quantity, StopMode};
use rung_engine::{next_stop_price, progress_of, scan_progress, stop_trigger};
use rung_store::RecordHandle;

use crate::error::ExecResult;
use crate::notify::Notifier;
use crate::outcome::OrderOutcome;
use crate::ports::ExchangeGateway;

/// Stop placement parameters.
#[derive(Debug, Clone, Copy)]
pub struct StopConfig {
    /// How the stop trails ladder progress
    pub mode: StopMode,
    /// Offset used at progress 0 and in fixed-offset mode, percent
    pub base_offset_pct: Decimal,
}

/// Maintains the stop order over a position's lifecycle.
pub struct StopController<G> {
    gateway: Arc<G>,
    notifier: Arc<dyn Notifier>,
    config: StopConfig,
}

impl<G: ExchangeGateway> StopController<G> {
    /// Create a stop controller.
    pub fn new(gateway: Arc<G>, notifier: Arc<dyn Notifier>, config: StopConfig) -> Self {
        Self { gateway, notifier, config }
    }

    /// Run one supervision tick for a slot.
    ///
    /// Places the initial stop when none exists yet, moves it when ladder
    /// progress advanced, and flags the slot for reset once every rung has
    /// been reached. A failed placement leaves the tracked progress
    /// untouched so the next tick retries the same move.
    pub async fn tick(&self, handle: &RecordHandle) -> ExecResult<()> {
        let mut record = handle.lock().await;
        if !record.in_position() || record.force_reset {
            return Ok(());
        }
        let entry_price = match record.entry_price {
            Some(price) => price,
            None => return Ok(()),
        };

        let symbol = record.symbol.clone();
        let side = record.side;

        let scan = scan_progress(&record.open_orders, side);
        // Progress never moves backwards, whatever the order map says.
        let progress = progress_of(scan.as_ref()).max(record.progress);

        if !record.tp_prices.is_empty() && progress >= record.tp_prices.len() {
            info!(%symbol, %side, progress, "Every rung reached, flagging reset");
            record.force_reset = true;
            self.notifier
                .notify(Notification::LifecycleComplete { symbol, side, at: Utc::now() })
                .await;
            return Ok(());
        }

        if record.sl_initiated && progress <= record.progress {
            return Ok(());
        }

        let stop_price = next_stop_price(
            &record.spec,
            side,
            self.config.mode,
            self.config.base_offset_pct,
            entry_price,
            &record.tp_prices,
            progress,
        )?;

        // Moving an existing stop: cancel first, best effort. A failed
        // cancel is not fatal, the replacement supersedes it.
        if progress > 0 {
            if let Some(old_id) = record.sl_order_id.take() {
                let outcome =
                    OrderOutcome::from_result(self.gateway.cancel_order(&symbol, &old_id).await);
                if !outcome.success {
                    warn!(%symbol, %side, order_id = %old_id, reason = outcome.reason(), "Stop cancel rejected");
                }
            }
        }

        if record.contracts <= Decimal::ZERO {
            return Ok(());
        }
        let contracts = Quantity::new(record.contracts)?;

        let outcome = OrderOutcome::from_result(
            self.gateway
                .place_trigger_order(
                    &symbol,
                    side.exit_action(),
                    contracts,
                    Price::new(stop_price)?,
                    stop_trigger(side),
                )
                .await,
        );

        if outcome.success {
            // Any placement landing past rung zero is a move worth
            // reporting, even when an earlier attempt never got a stop
            // onto the book.
            let moved = progress > 0 && progress > record.progress;
            record.sl_order_id = outcome.order_id;
            record.sl_price = Some(stop_price);
            record.sl_initiated = true;
            record.progress = progress;
            info!(%symbol, %side, progress, %stop_price, "Stop order placed");
            if moved {
                self.notifier
                    .notify(Notification::StopMoved {
                        symbol,
                        side,
                        rung: progress,
                        stop_price,
                        at: Utc::now(),
                    })
                    .await;
            }
        } else {
            warn!(%symbol, %side, reason = outcome.reason(), "Stop order rejected");
            self.notifier
                .notify(Notification::OrderFailed {
                    symbol,
                    side,
                    scope: OrderScope::StopLoss,
                    reason: outcome.reason().to_string(),
                    at: Utc::now(),
                })
                .await;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rung_domain::{
        LifecycleState, OrderSide, OrderState, Side, Symbol, SymbolSpec, TriggerDirection,
    };
    use rung_store::RecordStore;
    use rust_decimal_macros::dec;

    use crate::notify::RecordingNotifier;
    use crate::ports::GatewayError;
    use crate::stub::{GatewayCall, StubGateway};

    fn config() -> StopConfig {
        StopConfig { mode: StopMode::FixedOffset, base_offset_pct: dec!(10) }
    }

    async fn open_handle(store: &RecordStore, side: Side) -> RecordHandle {
        let symbol = Symbol::from_pair("BTC_USDT").unwrap();
        let spec = SymbolSpec::new(symbol.clone(), dec!(0.0001), dec!(1), 0, 1, 125).unwrap();
        let handle = store.ensure(symbol, side, &spec);
        {
            let mut record = handle.lock().await;
            record.transition(LifecycleState::PendingEntry).unwrap();
            record.transition(LifecycleState::Open).unwrap();
            record.entry_price = Some(dec!(100));
            record.contracts = dec!(10);
            record.record_rung_order("TP-1".to_string(), 0, dec!(103));
            record.record_rung_order("TP-2".to_string(), 1, dec!(107));
            record.record_rung_order("TP-3".to_string(), 2, dec!(110));
        }
        handle
    }

    #[tokio::test]
    async fn test_initial_stop_below_entry() {
        let gateway = Arc::new(StubGateway::new(dec!(100)));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = RecordStore::new();
        let handle = open_handle(&store, Side::Long).await;
        let stops = StopController::new(gateway.clone(), notifier.clone(), config());

        stops.tick(&handle).await.unwrap();

        let calls = gateway.calls().await;
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            &calls[0],
            GatewayCall::TriggerOrder {
                side: OrderSide::Sell,
                trigger_price,
                direction: TriggerDirection::AtOrBelow,
                ..
            } if *trigger_price == dec!(90)
        ));

        let record = handle.lock().await;
        assert!(record.sl_initiated);
        assert_eq!(record.sl_price, Some(dec!(90)));
        assert!(record.sl_order_id.is_some());
        assert_eq!(record.progress, 0);
        // The first placement is not a move.
        assert!(notifier.is_empty().await);
    }

    #[tokio::test]
    async fn test_stop_moves_after_rung_fill() {
        let gateway = Arc::new(StubGateway::new(dec!(100)));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = RecordStore::new();
        let handle = open_handle(&store, Side::Long).await;
        let stops = StopController::new(gateway.clone(), notifier.clone(), config());

        stops.tick(&handle).await.unwrap();
        let first_id = handle.lock().await.sl_order_id.clone().unwrap();
        gateway.clear_calls().await;

        handle.lock().await.apply_order_update("TP-1", OrderState::Filled);
        stops.tick(&handle).await.unwrap();

        // Cancel of the old stop, then the replacement at 103 x 0.9.
        let calls = gateway.calls().await;
        assert_eq!(calls.len(), 2);
        assert!(matches!(
            &calls[0],
            GatewayCall::CancelOrder { order_id, .. } if *order_id == first_id
        ));
        assert!(matches!(
            &calls[1],
            GatewayCall::TriggerOrder { trigger_price, .. } if *trigger_price == dec!(92.7)
        ));

        let record = handle.lock().await;
        assert_eq!(record.progress, 1);
        assert_eq!(record.sl_price, Some(dec!(92.7)));
        assert!(matches!(
            &notifier.received().await[0],
            Notification::StopMoved { rung: 1, stop_price, .. } if *stop_price == dec!(92.7)
        ));
    }

    #[tokio::test]
    async fn test_no_progress_means_no_churn() {
        let gateway = Arc::new(StubGateway::new(dec!(100)));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = RecordStore::new();
        let handle = open_handle(&store, Side::Long).await;
        let stops = StopController::new(gateway.clone(), notifier, config());

        stops.tick(&handle).await.unwrap();
        stops.tick(&handle).await.unwrap();
        stops.tick(&handle).await.unwrap();

        assert_eq!(gateway.placed_order_count().await, 1);
    }

    #[tokio::test]
    async fn test_completed_ladder_flags_reset() {
        let gateway = Arc::new(StubGateway::new(dec!(100)));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = RecordStore::new();
        let handle = open_handle(&store, Side::Long).await;
        let stops = StopController::new(gateway.clone(), notifier.clone(), config());

        {
            let mut record = handle.lock().await;
            record.apply_order_update("TP-1", OrderState::Filled);
            record.apply_order_update("TP-2", OrderState::Filled);
            record.apply_order_update("TP-3", OrderState::Filled);
        }
        stops.tick(&handle).await.unwrap();

        assert!(handle.lock().await.force_reset);
        assert!(gateway.calls().await.is_empty());
        assert!(matches!(
            &notifier.received().await[0],
            Notification::LifecycleComplete { .. }
        ));

        // Flagged slots are left alone.
        stops.tick(&handle).await.unwrap();
        assert!(gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_short_stop_above_entry() {
        let gateway = Arc::new(StubGateway::new(dec!(100)));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = RecordStore::new();
        let symbol = Symbol::from_pair("BTC_USDT").unwrap();
        let spec = SymbolSpec::new(symbol.clone(), dec!(0.0001), dec!(1), 0, 1, 125).unwrap();
        let handle = store.ensure(symbol, Side::Short, &spec);
        {
            let mut record = handle.lock().await;
            record.transition(LifecycleState::PendingEntry).unwrap();
            record.transition(LifecycleState::Open).unwrap();
            record.entry_price = Some(dec!(100));
            record.contracts = dec!(10);
        }
        let stops = StopController::new(
            gateway.clone(),
            notifier,
            StopConfig { mode: StopMode::FixedOffset, base_offset_pct: dec!(-20) },
        );

        stops.tick(&handle).await.unwrap();

        let calls = gateway.calls().await;
        assert!(matches!(
            &calls[0],
            GatewayCall::TriggerOrder {
                side: OrderSide::Buy,
                trigger_price,
                direction: TriggerDirection::AtOrAbove,
                ..
            } if *trigger_price == dec!(120)
        ));
    }

    #[tokio::test]
    async fn test_rejected_stop_retries_next_tick() {
        let gateway = Arc::new(StubGateway::new(dec!(100)));
        gateway.fail_next(GatewayError::Timeout).await;
        let notifier = Arc::new(RecordingNotifier::new());
        let store = RecordStore::new();
        let handle = open_handle(&store, Side::Long).await;
        let stops = StopController::new(gateway.clone(), notifier.clone(), config());

        stops.tick(&handle).await.unwrap();
        {
            let record = handle.lock().await;
            assert!(!record.sl_initiated);
            assert_eq!(record.sl_order_id, None);
        }
        assert!(matches!(
            &notifier.received().await[0],
            Notification::OrderFailed { scope: OrderScope::StopLoss, .. }
        ));

        stops.tick(&handle).await.unwrap();
        assert!(handle.lock().await.sl_initiated);
        assert_eq!(gateway.placed_order_count().await, 2);
    }

    #[tokio::test]
    async fn test_late_first_placement_still_notifies_move() {
        // The initial placement is rejected, a rung fills before the
        // retry lands; the first successful stop then sits at progress 1
        // and must announce the move.
        let gateway = Arc::new(StubGateway::new(dec!(100)));
        gateway.fail_next(GatewayError::Timeout).await;
        let notifier = Arc::new(RecordingNotifier::new());
        let store = RecordStore::new();
        let handle = open_handle(&store, Side::Long).await;
        let stops = StopController::new(gateway.clone(), notifier.clone(), config());

        stops.tick(&handle).await.unwrap();
        assert!(!handle.lock().await.sl_initiated);

        handle.lock().await.apply_order_update("TP-1", OrderState::Filled);
        stops.tick(&handle).await.unwrap();

        {
            let record = handle.lock().await;
            assert!(record.sl_initiated);
            assert_eq!(record.progress, 1);
            assert_eq!(record.sl_price, Some(dec!(92.7)));
        }
        let received = notifier.received().await;
        assert!(matches!(
            &received[0],
            Notification::OrderFailed { scope: OrderScope::StopLoss, .. }
        ));
        assert!(matches!(
            &received[1],
            Notification::StopMoved { rung: 1, stop_price, .. } if *stop_price == dec!(92.7)
        ));
    }

    #[tokio::test]
    async fn test_break_even_moves_to_entry() {
        let gateway = Arc::new(StubGateway::new(dec!(100)));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = RecordStore::new();
        let handle = open_handle(&store, Side::Long).await;
        let stops = StopController::new(
            gateway.clone(),
            notifier,
            StopConfig { mode: StopMode::BreakEvenLadder, base_offset_pct: dec!(10) },
        );

        stops.tick(&handle).await.unwrap();
        handle.lock().await.apply_order_update("TP-1", OrderState::Filled);
        gateway.clear_calls().await;
        stops.tick(&handle).await.unwrap();

        let calls = gateway.calls().await;
        assert!(matches!(
            &calls[1],
            GatewayCall::TriggerOrder { trigger_price, .. } if *trigger_price == dec!(100)
        ));
    }

    #[tokio::test]
    async fn test_idle_slot_is_ignored() {
        let gateway = Arc::new(StubGateway::new(dec!(100)));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = RecordStore::new();
        let symbol = Symbol::from_pair("BTC_USDT").unwrap();
        let spec = SymbolSpec::new(symbol.clone(), dec!(0.0001), dec!(1), 0, 1, 125).unwrap();
        let handle = store.ensure(symbol, Side::Long, &spec);
        let stops = StopController::new(gateway.clone(), notifier, config());

        stops.tick(&handle).await.unwrap();
        assert!(gateway.calls().await.is_empty());
    }
}
