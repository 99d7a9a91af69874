//! Session: main runtime orchestrator.
//!
//! Ties the components together and owns the main loop:
//!
//! 1. Load configuration
//! 2. Start the instrument refresh and reconciler tasks
//! 3. Main loop: dispatch signals, fold in order updates
//! 4. Graceful shutdown on SIGINT or cancellation
//!
//! Shutdown leaves exchange state alone: open positions are re-adopted by
//! the reconciler on the next start.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use rung_domain::{OrderState, Side};
use rung_exec::{
    EntryConfig, EntryExecutor, ExchangeGateway, LadderConfig, LadderScheduler, Notifier,
    OrderUpdate, StopConfig, StopController, StubGateway,
};
use rung_store::{RecordKey, RecordStore};
use rust_decimal_macros::dec;

use crate::config::Config;
use crate::dispatcher::{Dispatcher, TradeSignal};
use crate::error::DaemonResult;
use crate::instruments::InstrumentCache;
use crate::notifier::LogNotifier;
use crate::reconciler::Reconciler;

// =============================================================================
// Session
// =============================================================================

/// The main rung session.
pub struct Session<G> {
    config: Config,
    gateway: Arc<G>,
    store: Arc<RecordStore>,
    instruments: Arc<InstrumentCache>,
    reconciler: Arc<Reconciler<G>>,
    dispatcher: Arc<Dispatcher<G>>,
    token: CancellationToken,
}

impl Session<StubGateway> {
    /// Create a session against the stub gateway (testing/development).
    pub fn new_stub(config: Config) -> Self {
        Self::new(config, Arc::new(StubGateway::new(dec!(100))), Arc::new(LogNotifier::new()))
    }
}

impl<G: ExchangeGateway + 'static> Session<G> {
    /// Create a session with a provided gateway and notification sink.
    pub fn new(config: Config, gateway: Arc<G>, notifier: Arc<dyn Notifier>) -> Self {
        let store = Arc::new(RecordStore::new());
        let instruments = Arc::new(InstrumentCache::new());
        let token = CancellationToken::new();

        let reconciler = Arc::new(Reconciler::new(
            gateway.clone(),
            store.clone(),
            notifier.clone(),
            config.stop,
            config.timing,
        ));

        let entry = EntryExecutor::new(
            gateway.clone(),
            notifier.clone(),
            EntryConfig {
                margin_size: config.sizing.margin_size,
                leverage: config.sizing.leverage,
                tier_target: config.sizing.tier_target,
                tiers: config.sizing.tiers.clone(),
            },
        );
        let supervisor = Arc::new(rung_exec::LadderSupervisor::new(
            LadderScheduler::new(
                gateway.clone(),
                notifier.clone(),
                LadderConfig {
                    pacing: config.pacing,
                    entry_wait: config.timing.entry_wait,
                    entry_poll: config.timing.entry_poll,
                },
            ),
            StopController::new(
                gateway.clone(),
                notifier.clone(),
                StopConfig { mode: config.stop.mode, base_offset_pct: config.stop.offset_pct },
            ),
            config.timing.supervisor_interval,
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            instruments.clone(),
            entry,
            supervisor,
            notifier,
            config.ladder.clone(),
            config.timing,
            reconciler.first_sync(),
            token.clone(),
        ));

        Self { config, gateway, store, instruments, reconciler, dispatcher, token }
    }

    /// The gateway this session trades through.
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// The position record store.
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// The signal dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher<G>> {
        &self.dispatcher
    }

    /// The reconciler.
    pub fn reconciler(&self) -> &Arc<Reconciler<G>> {
        &self.reconciler
    }

    /// The instrument cache.
    pub fn instruments(&self) -> &Arc<InstrumentCache> {
        &self.instruments
    }

    /// Token cancelling every task this session spawned.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run the session until shutdown.
    pub async fn run(
        &self,
        mut signals: mpsc::Receiver<TradeSignal>,
        mut order_updates: mpsc::Receiver<OrderUpdate>,
    ) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            "Starting rung session"
        );

        let refresh_task = self.instruments.clone().spawn_refresh(
            self.gateway.clone(),
            self.config.timing.instrument_refresh,
            self.token.clone(),
        );
        let sync_task = self.reconciler.clone().spawn(self.token.clone());

        info!("Entering main loop");
        loop {
            tokio::select! {
                Some(signal) = signals.recv() => {
                    let dispatcher = self.dispatcher.clone();
                    tokio::spawn(async move {
                        if let Err(e) = dispatcher.dispatch(signal).await {
                            error!(error = %e, "Dispatch failed");
                        }
                    });
                }

                Some(update) = order_updates.recv() => {
                    self.apply_order_update(update).await;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }

                _ = self.token.cancelled() => {
                    info!("Session cancelled");
                    break;
                }
            }
        }

        self.shutdown().await;
        let _ = refresh_task.await;
        let _ = sync_task.await;
        Ok(())
    }

    /// Fold an order-update stream event into whichever slot tracks the
    /// order. Hedge mode means the update could belong to either side.
    pub async fn apply_order_update(&self, update: OrderUpdate) {
        let state = match OrderState::from_exchange_code(update.state_code) {
            Some(state) => state,
            None => {
                warn!(order_id = %update.order_id, code = update.state_code, "Unknown order state code");
                return;
            }
        };

        for side in [Side::Long, Side::Short] {
            let key = RecordKey::new(update.symbol.clone(), side);
            if let Some(handle) = self.store.get(&key) {
                handle.lock().await.apply_order_update(&update.order_id, state);
            }
        }
    }

    /// Graceful shutdown: stop tasks, keep exchange state.
    async fn shutdown(&self) {
        info!("Initiating graceful shutdown");
        self.token.cancel();
        self.dispatcher.abort_supervisors().await;

        let mut held = 0usize;
        for (_, handle) in self.store.handles() {
            if handle.lock().await.in_position() {
                held += 1;
            }
        }
        info!(held_positions = held, "Shutdown complete, positions left for re-adoption");
    }
}

// =============================================================================
// Tests
// =============================================================================
