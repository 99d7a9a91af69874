//! Engine error types.

use thiserror::Error;

/// Errors from pure engine calculations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Entry price must be positive before anything can be planned
    #[error("Invalid entry price: {0}")]
    InvalidEntryPrice(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
