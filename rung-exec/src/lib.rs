//! Order execution layer.
//!
//! Everything that talks to the exchange on behalf of a position slot:
//! the gateway port and its stub, outcome validation, the entry and exit
//! executors, the ladder scheduler and the stop controller, tied together
//! per slot by the supervisor.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entry;
pub mod error;
pub mod exit;
pub mod ladder;
pub mod notify;
pub mod outcome;
pub mod ports;
pub mod stops;
pub mod stub;
pub mod supervisor;

pub use entry::{EntryConfig, EntryExecutor};
pub use error::{ExecError, ExecResult};
pub use exit::ExitExecutor;
pub use ladder::{LadderConfig, LadderScheduler};
pub use notify::{Notifier, RecordingNotifier};
pub use outcome::{OrderOutcome, UNKNOWN_ERROR};
pub use ports::{
    ExchangeGateway, GatewayError, OrderUpdate, PositionSnapshot, RawOrderResponse, SettlementRow,
};
pub use stops::{StopConfig, StopController};
pub use stub::{GatewayCall, StubGateway};
pub use supervisor::LadderSupervisor;
