//! Signal dispatch.
//!
//! Takes an incoming trade signal through admission (staleness, repeat
//! suppression, per-slot serialization, busy-slot checks), resolves the
//! ladder for the signal's market cap, fires the entry and hands the slot
//! to a supervisor task.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use rung_domain::{Ladder, LifecycleState, Notification, Side, Symbol};
use rung_exec::{EntryExecutor, ExchangeGateway, LadderSupervisor, Notifier};
use rung_store::{RecordKey, RecordStore};

use crate::config::{LadderSettings, TimingConfig};
use crate::error::DaemonResult;
use crate::instruments::InstrumentCache;

/// An actionable trade signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Signal id
    pub id: Uuid,
    /// Symbol to trade
    pub symbol: Symbol,
    /// Direction
    pub side: Side,
    /// Market cap of the base asset, quote units, when known
    pub market_cap: Option<Decimal>,
    /// When the signal was produced
    pub received_at: DateTime<Utc>,
}

impl TradeSignal {
    /// Create a signal stamped now.
    pub fn new(symbol: Symbol, side: Side, market_cap: Option<Decimal>) -> Self {
        Self {
            id: Uuid::now_v7(),
            symbol,
            side,
            market_cap,
            received_at: Utc::now(),
        }
    }
}

/// Admits signals and opens lifecycles.
pub struct Dispatcher<G> {
    store: Arc<RecordStore>,
    instruments: Arc<InstrumentCache>,
    entry: EntryExecutor<G>,
    supervisor: Arc<LadderSupervisor<G>>,
    notifier: Arc<dyn Notifier>,
    ladder: LadderSettings,
    timing: TimingConfig,
    first_sync: watch::Receiver<bool>,
    token: CancellationToken,

    // Serializes dispatch per slot; entries are created once and kept.
    slot_locks: Mutex<HashMap<RecordKey, Arc<Mutex<()>>>>,
    last_accepted: Mutex<HashMap<RecordKey, DateTime<Utc>>>,
    supervisors: Mutex<HashMap<RecordKey, JoinHandle<()>>>,
}

impl<G: ExchangeGateway + 'static> Dispatcher<G> {
    /// Create a dispatcher.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<RecordStore>,
        instruments: Arc<InstrumentCache>,
        entry: EntryExecutor<G>,
        supervisor: Arc<LadderSupervisor<G>>,
        notifier: Arc<dyn Notifier>,
        ladder: LadderSettings,
        timing: TimingConfig,
        first_sync: watch::Receiver<bool>,
        token: CancellationToken,
    ) -> Self {
        Self {
            store,
            instruments,
            entry,
            supervisor,
            notifier,
            ladder,
            timing,
            first_sync,
            token,
            slot_locks: Mutex::new(HashMap::new()),
            last_accepted: Mutex::new(HashMap::new()),
            supervisors: Mutex::new(HashMap::new()),
        }
    }

    /// Dispatch one signal. Every rejection is a quiet skip, never an
    /// error; errors are reserved for broken machinery.
    pub async fn dispatch(&self, signal: TradeSignal) -> DaemonResult<()> {
        let age = Utc::now() - signal.received_at;
        if age.to_std().unwrap_or_default() > self.timing.signal_timeout {
            debug!(signal_id = %signal.id, symbol = %signal.symbol, "Signal too old, dropped");
            return Ok(());
        }

        let key = RecordKey::new(signal.symbol.clone(), signal.side);
        if !self.admit_repeat(&key).await {
            debug!(signal_id = %signal.id, slot = %key, "Repeat signal suppressed");
            return Ok(());
        }

        let slot_lock = self.slot_lock(&key).await;
        let _guard = match slot_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(signal_id = %signal.id, slot = %key, "Slot busy dispatching, dropped");
                return Ok(());
            }
        };

        // Never act before the exchange state has been seen once.
        let mut first_sync = self.first_sync.clone();
        if first_sync.wait_for(|done| *done).await.is_err() {
            return Ok(());
        }

        let spec = match self.instruments.get(&signal.symbol).await {
            Some(spec) => spec,
            None => {
                warn!(symbol = %signal.symbol, "Unknown instrument, signal dropped");
                return Ok(());
            }
        };

        let handle = self.store.ensure(signal.symbol.clone(), signal.side, &spec);
        {
            let mut record = handle.lock().await;
            if record.state != LifecycleState::Idle || record.reset_in_progress {
                debug!(slot = %key, state = %record.state, "Slot occupied, signal dropped");
                let adopted = record.in_position() && !record.reset_in_progress;
                drop(record);
                // A position the reconciler adopted was never dispatched;
                // a signal landing on its slot still attaches stop
                // supervision.
                if adopted {
                    self.ensure_supervisor(key, handle).await;
                }
                return Ok(());
            }
            record.ladder = Some(self.resolve_ladder(signal.market_cap)?);
        }

        info!(signal_id = %signal.id, slot = %key, "Signal accepted");
        self.notifier
            .notify(Notification::SignalReceived {
                symbol: signal.symbol.clone(),
                side: signal.side,
                signal_id: signal.id,
                at: Utc::now(),
            })
            .await;

        let cap = signal.market_cap.unwrap_or(Decimal::ZERO);
        if !self.entry.open_position(&handle, cap).await? {
            // Failed entries leave the slot Idle; clear the staged ladder.
            handle.lock().await.ladder = None;
        }
        // Supervision is attached whatever the entry outcome; a slot
        // that stayed Idle makes the task exit on its own.
        self.ensure_supervisor(key, handle).await;
        Ok(())
    }

    /// Start (or restart) the supervisor task for a slot.
    pub async fn ensure_supervisor(&self, key: RecordKey, handle: rung_store::RecordHandle) {
        let mut supervisors = self.supervisors.lock().await;
        if let Some(task) = supervisors.get(&key) {
            if !task.is_finished() {
                return;
            }
        }
        let task = self
            .supervisor
            .clone()
            .spawn(handle, self.token.child_token());
        supervisors.insert(key, task);
    }

    /// Abort every supervisor task. Shutdown path.
    pub async fn abort_supervisors(&self) {
        let mut supervisors = self.supervisors.lock().await;
        for (_, task) in supervisors.drain() {
            task.abort();
        }
    }

    fn resolve_ladder(&self, market_cap: Option<Decimal>) -> DaemonResult<Ladder> {
        if let Some(cap) = market_cap {
            if let Some(ladder) = self.ladder.cap_ladders.resolve(cap) {
                return Ok(ladder);
            }
        }
        Ladder::from_offsets(&self.ladder.default_offsets, self.ladder.volume_pct)
            .map_err(Into::into)
    }

    async fn slot_lock(&self, key: &RecordKey) -> Arc<Mutex<()>> {
        let mut locks = self.slot_locks.lock().await;
        locks.entry(key.clone()).or_default().clone()
    }

    async fn admit_repeat(&self, key: &RecordKey) -> bool {
        let mut last = self.last_accepted.lock().await;
        let now = Utc::now();
        if let Some(at) = last.get(key) {
            if (now - *at).to_std().unwrap_or_default() < self.timing.repeat_window {
                return false;
            }
        }
        last.insert(key.clone(), now);
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
