//! Rung engine layer.
//!
//! Pure, deterministic decision logic: entry sizing, ladder planning,
//! pacing delays, trailing stop levels and progress detection. No I/O and
//! no clocks; randomness is injected by the caller.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod pacing;
pub mod plan;
pub mod progress;
pub mod sizing;
pub mod stops;

pub use error::{EngineError, EngineResult};
pub use pacing::{pacing_delays, PacingConfig};
pub use plan::{plan_ladder, rung_price, LadderPlan, PlannedRung};
pub use progress::{progress_of, scan_progress, ProgressScan};
pub use sizing::{apply_tier, contract_quantity, SizedEntry};
pub use stops::{next_stop_price, profit_trigger, stop_trigger};
