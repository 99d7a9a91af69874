//! Rung daemon library.
//!
//! Runtime orchestrator for the rung position-lifecycle engine.
//!
//! # Architecture
//!
//! ```text
//! Signal source → Dispatcher → Entry Executor → Exchange Gateway
//!                     ↓
//!             Ladder Supervisor (scheduler + stop controller, per slot)
//!                     ↑
//!              Reconciler (periodic exchange sync, fills and resets)
//! ```
//!
//! # Components
//!
//! - **Session**: main runtime orchestrator and event loop
//! - **Dispatcher**: signal admission and lifecycle kickoff
//! - **Reconciler**: exchange sync, fill capture, reset path
//! - **InstrumentCache**: periodically refreshed contract specs
//! - **Config**: environment-based configuration

#![warn(clippy::all)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod instruments;
pub mod notifier;
pub mod reconciler;
pub mod session;

// Re-exports for convenience
pub use config::{Config, Environment, LadderSettings, SizingConfig, StopSettings, TimingConfig};
pub use dispatcher::{Dispatcher, TradeSignal};
pub use error::{DaemonError, DaemonResult};
pub use instruments::InstrumentCache;
pub use notifier::LogNotifier;
pub use reconciler::Reconciler;
pub use session::Session;
