//! Exchange gateway port.
//!
//! The trait boundary between the engine and whatever speaks to the
//! exchange. Implementations own transport details (signing, retries on
//! network errors); the execution layer treats one gateway call as one
//! attempt and interprets the raw response through the outcome validator.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rung_domain::{OrderSide, Price, Quantity, Side, Symbol, SymbolSpec, TriggerDirection};

// =============================================================================
// Gateway errors
// =============================================================================

/// Errors surfaced by a gateway implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Transport-level failure (connection, TLS, serialization)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The exchange answered but refused the request outright
    #[error("Request rejected: code {code}: {message}")]
    Rejected {
        /// Exchange error code
        code: i64,
        /// Exchange error message
        message: String,
    },

    /// The request timed out
    #[error("Request timed out")]
    Timeout,
}

impl GatewayError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transport(_) | GatewayError::Timeout)
    }
}

// =============================================================================
// Wire DTOs
// =============================================================================

/// Raw order-placement response as the exchange shapes it.
///
/// Success is only meaningful through the outcome validator: the exchange
/// can answer `success = true` while still carrying a non-zero error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOrderResponse {
    /// Exchange-level success flag
    pub success: bool,
    /// Exchange error code; 0 means accepted
    pub code: i64,
    /// Assigned order id, when present
    pub order_id: Option<String>,
    /// Exchange timestamp in milliseconds, when present
    pub timestamp_ms: Option<i64>,
    /// Error message, when present
    pub message: Option<String>,
}

/// One held position as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Symbol of the position
    pub symbol: Symbol,
    /// Position direction (hedge mode)
    pub side: Side,
    /// Held contracts; zero means flat
    pub contracts: Decimal,
    /// Volume-weighted hold price
    pub hold_price: Decimal,
    /// Leverage reported by the exchange
    pub leverage: u32,
}

/// One realized-PnL settlement row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRow {
    /// Symbol the settlement belongs to
    pub symbol: Symbol,
    /// Side of the position that settled
    pub side: Side,
    /// Realized profit in quote units (signed)
    pub realized_pnl: Decimal,
    /// Settlement timestamp in milliseconds
    pub settled_at_ms: i64,
}

/// Order state change pushed by the order-update stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    /// Symbol the order belongs to
    pub symbol: Symbol,
    /// Exchange order id
    pub order_id: String,
    /// Numeric order state as the exchange encodes it
    pub state_code: i64,
}

// =============================================================================
// Gateway trait
// =============================================================================

/// Port to the futures exchange.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Fetch contract specs for every tradable instrument.
    async fn instruments(&self) -> Result<Vec<SymbolSpec>, GatewayError>;

    /// Current fair price for a symbol.
    async fn fair_price(&self, symbol: &Symbol) -> Result<Price, GatewayError>;

    /// All currently held positions, batched in one call.
    async fn open_positions(&self) -> Result<Vec<PositionSnapshot>, GatewayError>;

    /// Place a market order.
    async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        contracts: Quantity,
        leverage: u32,
        reduce_only: bool,
    ) -> Result<RawOrderResponse, GatewayError>;

    /// Place a reduce-only limit order (take-profit rung).
    async fn place_limit_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        contracts: Quantity,
        price: Price,
    ) -> Result<RawOrderResponse, GatewayError>;

    /// Place a conditional market order (stop).
    async fn place_trigger_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        contracts: Quantity,
        trigger_price: Price,
        direction: TriggerDirection,
    ) -> Result<RawOrderResponse, GatewayError>;

    /// Cancel one order by id.
    async fn cancel_order(
        &self,
        symbol: &Symbol,
        order_id: &str,
    ) -> Result<RawOrderResponse, GatewayError>;

    /// Cancel every open order on a symbol.
    async fn cancel_all_orders(&self, symbol: &Symbol) -> Result<RawOrderResponse, GatewayError>;

    /// Settlement rows for a symbol since a millisecond timestamp.
    async fn settlements(
        &self,
        symbol: &Symbol,
        since_ms: i64,
    ) -> Result<Vec<SettlementRow>, GatewayError>;
}

// =============================================================================
// Tests
// =============================================================================
