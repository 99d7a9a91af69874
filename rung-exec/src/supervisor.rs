//! Per-slot lifecycle supervision.
//!
//! One supervisor task runs per dispatched (symbol, side) slot: it places
//! the ladder, then ticks the stop controller until the reconciler resets
//! the slot or shutdown is requested. Preexisting positions skip the
//! ladder and only get stop supervision.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use rung_domain::LifecycleState;
use rung_store::RecordHandle;

use crate::error::ExecError;
use crate::ladder::LadderScheduler;
use crate::ports::ExchangeGateway;
use crate::stops::StopController;

/// Drives one slot from dispatch to reset.
pub struct LadderSupervisor<G> {
    scheduler: LadderScheduler<G>,
    stops: StopController<G>,
    interval: Duration,
}

impl<G: ExchangeGateway + 'static> LadderSupervisor<G> {
    /// Create a supervisor.
    pub fn new(
        scheduler: LadderScheduler<G>,
        stops: StopController<G>,
        interval: Duration,
    ) -> Self {
        Self { scheduler, stops, interval }
    }

    /// Spawn the supervision task for a slot.
    pub fn spawn(
        self: Arc<Self>,
        handle: RecordHandle,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(handle, token).await })
    }

    async fn run(&self, handle: RecordHandle, token: CancellationToken) {
        let (key, preexisting) = {
            let mut record = handle.lock().await;
            let key = format!("{}:{}", record.symbol, record.side);
            // Adopted positions keep whatever stop they already carry on
            // the exchange; the first tick must not plant a fresh one at
            // stale progress.
            if record.preexisting {
                record.sl_initiated = true;
            }
            (key, record.preexisting)
        };

        if preexisting {
            debug!(slot = %key, "Preexisting position, skipping ladder placement");
        } else if let Err(e) = self.scheduler.place_ladder(&handle, &token).await {
            match e {
                // Idle slot or shutdown; nothing to place.
                ExecError::Cancelled => debug!(slot = %key, "Ladder placement skipped"),
                e => warn!(slot = %key, error = %e, "Ladder placement abandoned"),
            }
        }

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            {
                let record = handle.lock().await;
                if record.force_reset || record.state == LifecycleState::Idle {
                    debug!(slot = %key, "Slot finished, supervisor exiting");
                    break;
                }
            }

            if let Err(e) = self.stops.tick(&handle).await {
                warn!(slot = %key, error = %e, "Stop tick failed");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
