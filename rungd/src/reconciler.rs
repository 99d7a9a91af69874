//! Position reconciler.
//!
//! The periodic sync cycle against the exchange: one batched position
//! fetch per cycle, fanned out over every tracked slot. The reconciler is
//! the only component that captures entry fills and the only one that
//! runs the reset path, so a slot cannot be torn down twice concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rung_domain::{format_duration, LifecycleState, Notification, PositionRecord};
use rung_engine::{next_stop_price, rung_price};
use rung_exec::{ExchangeGateway, ExitExecutor, Notifier, PositionSnapshot};
use rung_store::{RecordHandle, RecordKey, RecordStore};

use crate::config::{StopSettings, TimingConfig};
use crate::error::DaemonResult;

/// Reconciles tracked slots against exchange positions.
pub struct Reconciler<G> {
    gateway: Arc<G>,
    store: Arc<RecordStore>,
    notifier: Arc<dyn Notifier>,
    exit: ExitExecutor<G>,
    stop: StopSettings,
    timing: TimingConfig,
    first_sync_tx: watch::Sender<bool>,
}

impl<G: ExchangeGateway + 'static> Reconciler<G> {
    /// Create a reconciler.
    pub fn new(
        gateway: Arc<G>,
        store: Arc<RecordStore>,
        notifier: Arc<dyn Notifier>,
        stop: StopSettings,
        timing: TimingConfig,
    ) -> Self {
        let (first_sync_tx, _) = watch::channel(false);
        Self {
            exit: ExitExecutor::new(gateway.clone()),
            gateway,
            store,
            notifier,
            stop,
            timing,
            first_sync_tx,
        }
    }

    /// Receiver that flips to true after the first completed cycle.
    ///
    /// Dispatch waits on this so a signal arriving at boot cannot re-enter
    /// a position the exchange already holds.
    pub fn first_sync(&self) -> watch::Receiver<bool> {
        self.first_sync_tx.subscribe()
    }

    /// Spawn the periodic sync task.
    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.sync_once().await {
                    warn!(error = %e, "Sync cycle failed");
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(self.timing.sync_interval) => {}
                }
            }
        })
    }

    /// Run one full sync cycle.
    pub async fn sync_once(&self) -> DaemonResult<()> {
        let positions = self.gateway.open_positions().await?;
        let by_slot: HashMap<RecordKey, PositionSnapshot> = positions
            .into_iter()
            .map(|snapshot| (RecordKey::new(snapshot.symbol.clone(), snapshot.side), snapshot))
            .collect();

        for (key, handle) in self.store.handles() {
            match by_slot.get(&key) {
                Some(snapshot) if snapshot.contracts > Decimal::ZERO => {
                    self.update_active(&handle, snapshot).await;
                }
                _ => self.maybe_reset(&handle).await,
            }
        }

        self.first_sync_tx.send_replace(true);
        Ok(())
    }

    /// Fold a live exchange snapshot into the slot.
    async fn update_active(&self, handle: &RecordHandle, snapshot: &PositionSnapshot) {
        let mut record = handle.lock().await;

        record.contracts = snapshot.contracts;
        record.vol_assets = snapshot.contracts * record.spec.contract_size;
        record.hold_price = Some(snapshot.hold_price);
        if record.leverage == 0 {
            record.leverage = snapshot.leverage;
        }

        if record.entry_price.is_some() {
            return;
        }

        // First observed fill for this slot.
        record.entry_price = Some(snapshot.hold_price);
        record.opened_at = Some(Utc::now());

        let adopted = match record.state {
            LifecycleState::PendingEntry => {
                record.transition(LifecycleState::Open).ok();
                false
            }
            LifecycleState::Idle => {
                // Position nobody here opened: adopt it, stop supervision
                // only, no ladder.
                record.preexisting = true;
                record.transition(LifecycleState::Open).ok();
                true
            }
            _ => false,
        };

        info!(
            symbol = %record.symbol,
            side = %record.side,
            entry_price = %snapshot.hold_price,
            contracts = %snapshot.contracts,
            adopted,
            "Entry fill observed"
        );

        let tp_preview: Vec<Decimal> = record
            .ladder
            .as_ref()
            .map(|ladder| {
                ladder
                    .steps()
                    .iter()
                    .map(|step| {
                        rung_price(&record.spec, record.side, snapshot.hold_price, step.offset_pct)
                    })
                    .collect()
            })
            .unwrap_or_default();
        let sl_preview = next_stop_price(
            &record.spec,
            record.side,
            self.stop.mode,
            self.stop.offset_pct,
            snapshot.hold_price,
            &tp_preview,
            0,
        )
        .ok();

        self.notifier
            .notify(Notification::PositionFilled {
                symbol: record.symbol.clone(),
                side: record.side,
                entry_price: snapshot.hold_price,
                contracts: snapshot.contracts,
                vol_assets: record.vol_assets,
                tp_prices: tp_preview,
                sl_price: sl_preview,
                at: Utc::now(),
            })
            .await;
    }

    /// Run the reset path for a slot the exchange reports flat.
    async fn maybe_reset(&self, handle: &RecordHandle) {
        let mut record = handle.lock().await;

        // Nothing to tear down. An idle slot without the completion flag
        // is just a slot that never opened.
        if record.state == LifecycleState::Idle && !record.force_reset {
            return;
        }
        // An entry still waiting for its fill is not flat, it is early.
        if record.state == LifecycleState::PendingEntry && !record.force_reset {
            return;
        }
        if record.reset_in_progress {
            return;
        }
        record.reset_in_progress = true;

        if record.state.can_transition(LifecycleState::Closing) {
            record.transition(LifecycleState::Closing).ok();
        }
        debug!(symbol = %record.symbol, side = %record.side, "Running reset path");

        self.report_closing(&mut record).await;
        // Exchange says flat; contracts on the record are stale. Clear
        // them so the exit path only cancels leftovers.
        record.contracts = Decimal::ZERO;
        self.exit.close_position(&record).await;
        record.reset();
    }

    /// Emit the debounced closing report.
    async fn report_closing(&self, record: &mut PositionRecord) {
        let opened_at = match record.opened_at {
            Some(at) => at,
            None => return,
        };
        let now = Utc::now();
        if let Some(last) = record.last_report_at {
            let debounce = chrono::Duration::from_std(self.timing.pnl_debounce)
                .unwrap_or_else(|_| chrono::Duration::seconds(3));
            if now - last < debounce {
                return;
            }
        }

        let realized_pnl = match self
            .gateway
            .settlements(&record.symbol, opened_at.timestamp_millis())
            .await
        {
            Ok(rows) => rows
                .iter()
                .filter(|row| row.side == record.side)
                .map(|row| row.realized_pnl)
                .sum::<Decimal>(),
            Err(e) => {
                warn!(symbol = %record.symbol, error = %e, "Settlement fetch failed, reporting zero PnL");
                Decimal::ZERO
            }
        };
        let profit_pct = if record.margin_size > Decimal::ZERO {
            realized_pnl / record.margin_size * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        record.last_report_at = Some(now);
        self.notifier
            .notify(Notification::ClosingReport {
                symbol: record.symbol.clone(),
                side: record.side,
                realized_pnl,
                profit_pct,
                time_in_deal: format_duration(now - opened_at),
                at: now,
            })
            .await;
    }
}

// =============================================================================
// Tests
// =============================================================================
