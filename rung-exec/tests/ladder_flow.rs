//! End-to-end ladder flow against the stub gateway: entry, ladder
//! placement, trailing stop moves, completion.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use rung_domain::{
    Ladder, LadderStep, LifecycleState, Notification, OrderSide, OrderState, Side, StopMode,
    Symbol, SymbolSpec, TierTable, TierTarget, TriggerDirection,
};
use rung_engine::PacingConfig;
use rung_exec::{
    EntryConfig, EntryExecutor, GatewayCall, LadderConfig, LadderScheduler, RecordingNotifier,
    StopConfig, StopController, StubGateway,
};
use rung_store::{RecordHandle, RecordStore};

fn spec(symbol: &Symbol) -> SymbolSpec {
    SymbolSpec::new(symbol.clone(), dec!(0.0001), dec!(1), 0, 1, 125).unwrap()
}

fn three_rung_ladder() -> Ladder {
    Ladder::new(vec![
        LadderStep { offset_pct: dec!(3), volume_pct: dec!(20) },
        LadderStep { offset_pct: dec!(7), volume_pct: dec!(20) },
        LadderStep { offset_pct: dec!(10), volume_pct: dec!(60) },
    ])
    .unwrap()
}

fn zero_pacing() -> LadderConfig {
    LadderConfig {
        pacing: PacingConfig { base_secs: 0.0, increment_secs: 0.0, noise_secs: 0.0 },
        entry_wait: Duration::from_millis(500),
        entry_poll: Duration::from_millis(5),
    }
}

/// Simulate the reconciler observing the entry fill.
async fn observe_fill(handle: &RecordHandle, entry_price: Decimal, contracts: Decimal) {
    let mut record = handle.lock().await;
    record.transition(LifecycleState::Open).unwrap();
    record.entry_price = Some(entry_price);
    record.contracts = contracts;
    record.vol_assets = contracts * record.spec.contract_size;
    record.ladder = Some(three_rung_ladder());
}

#[tokio::test]
async fn long_lifecycle_trails_stop_up_the_ladder() {
    let gateway = Arc::new(StubGateway::new(dec!(100)));
    let notifier = Arc::new(RecordingNotifier::new());
    let store = RecordStore::new();
    let symbol = Symbol::from_pair("BTC_USDT").unwrap();
    let handle = store.ensure(symbol.clone(), Side::Long, &spec(&symbol));

    let entry = EntryExecutor::new(
        gateway.clone(),
        notifier.clone(),
        EntryConfig {
            margin_size: dec!(50),
            leverage: 20,
            tier_target: TierTarget::Margin,
            tiers: TierTable::empty(),
        },
    );
    let scheduler = LadderScheduler::new(gateway.clone(), notifier.clone(), zero_pacing());
    let stops = StopController::new(
        gateway.clone(),
        notifier.clone(),
        StopConfig { mode: StopMode::FixedOffset, base_offset_pct: dec!(10) },
    );

    // Entry: margin 50 x lev 20 / price 100 / contract 0.0001 = 100_000.
    assert!(entry.open_position(&handle, dec!(1_000_000)).await.unwrap());
    assert_eq!(handle.lock().await.state, LifecycleState::PendingEntry);

    observe_fill(&handle, dec!(100), dec!(10)).await;
    scheduler
        .place_ladder(&handle, &CancellationToken::new())
        .await
        .unwrap();

    {
        let record = handle.lock().await;
        assert_eq!(record.state, LifecycleState::LadderActive);
        assert_eq!(record.tp_prices, vec![dec!(103), dec!(107), dec!(110)]);
    }

    // Initial stop at 100 x 0.9.
    stops.tick(&handle).await.unwrap();
    assert_eq!(handle.lock().await.sl_price, Some(dec!(90)));

    // First rung fills; the stop trails to 103 x 0.9.
    let first_tp = handle
        .lock()
        .await
        .open_orders
        .iter()
        .find(|(_, o)| o.rung == 0)
        .map(|(id, _)| id.clone())
        .unwrap();
    handle.lock().await.apply_order_update(&first_tp, OrderState::Filled);
    stops.tick(&handle).await.unwrap();
    assert_eq!(handle.lock().await.sl_price, Some(dec!(92.7)));
    assert_eq!(handle.lock().await.progress, 1);

    // Remaining rungs fill; the controller flags the slot for reset.
    let ids: Vec<String> = handle.lock().await.open_orders.keys().cloned().collect();
    for id in ids {
        handle.lock().await.apply_order_update(&id, OrderState::Filled);
    }
    stops.tick(&handle).await.unwrap();
    assert!(handle.lock().await.force_reset);

    let received = notifier.received().await;
    assert!(received.iter().any(|n| matches!(n, Notification::StopMoved { rung: 1, .. })));
    assert!(received.iter().any(|n| matches!(n, Notification::LifecycleComplete { .. })));
}

#[tokio::test]
async fn short_lifecycle_places_buy_side_orders() {
    let gateway = Arc::new(StubGateway::new(dec!(100)));
    let notifier = Arc::new(RecordingNotifier::new());
    let store = RecordStore::new();
    let symbol = Symbol::from_pair("ETH_USDT").unwrap();
    let handle = store.ensure(symbol.clone(), Side::Short, &spec(&symbol));

    {
        let mut record = handle.lock().await;
        record.transition(LifecycleState::PendingEntry).unwrap();
    }
    observe_fill(&handle, dec!(100), dec!(10)).await;

    let scheduler = LadderScheduler::new(gateway.clone(), notifier.clone(), zero_pacing());
    let stops = StopController::new(
        gateway.clone(),
        notifier,
        StopConfig { mode: StopMode::FixedOffset, base_offset_pct: dec!(-20) },
    );

    scheduler
        .place_ladder(&handle, &CancellationToken::new())
        .await
        .unwrap();
    stops.tick(&handle).await.unwrap();

    let calls = gateway.calls().await;
    let limit_prices: Vec<Decimal> = calls
        .iter()
        .filter_map(|c| match c {
            GatewayCall::LimitOrder { side, price, .. } => {
                assert_eq!(*side, OrderSide::Buy);
                Some(*price)
            }
            _ => None,
        })
        .collect();
    assert_eq!(limit_prices, vec![dec!(97), dec!(93), dec!(90)]);

    // Stop above entry, firing on the way up.
    assert!(calls.iter().any(|c| matches!(
        c,
        GatewayCall::TriggerOrder {
            side: OrderSide::Buy,
            trigger_price,
            direction: TriggerDirection::AtOrAbove,
            ..
        } if *trigger_price == dec!(120)
    )));
}
