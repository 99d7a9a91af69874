//! Daemon error types.

use thiserror::Error;

use rung_domain::DomainError;
use rung_engine::EngineError;
use rung_exec::{ExecError, GatewayError};

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Execution error
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Gateway error
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shutdown requested
    #[error("Shutdown requested")]
    Shutdown,
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
