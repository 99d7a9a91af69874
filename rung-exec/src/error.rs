//! Execution error types.

use rung_domain::DomainError;
use rung_engine::EngineError;
use thiserror::Error;

use crate::ports::GatewayError;

/// Execution-layer errors.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Gateway error
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Entry fill never showed up within the wait window
    #[error("Entry fill never observed for {0}")]
    EntryWaitTimeout(String),

    /// Operation aborted by cancellation
    #[error("Cancelled")]
    Cancelled,
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
