//! Stub gateway for tests and development.
//!
//! Deterministic in-memory implementation of `ExchangeGateway`: scripted
//! prices, positions and settlements, sequential order ids, one-shot
//! failure injection, and a full call log for assertions.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use rung_domain::{OrderSide, Price, Quantity, Side, Symbol, SymbolSpec, TriggerDirection};

use crate::ports::{
    ExchangeGateway, GatewayError, PositionSnapshot, RawOrderResponse, SettlementRow,
};

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    /// Market order placement
    MarketOrder {
        /// Symbol traded
        symbol: Symbol,
        /// Order direction
        side: OrderSide,
        /// Contracts
        contracts: Decimal,
        /// Reduce-only flag
        reduce_only: bool,
    },
    /// Limit order placement
    LimitOrder {
        /// Symbol traded
        symbol: Symbol,
        /// Order direction
        side: OrderSide,
        /// Contracts
        contracts: Decimal,
        /// Limit price
        price: Decimal,
    },
    /// Trigger order placement
    TriggerOrder {
        /// Symbol traded
        symbol: Symbol,
        /// Order direction
        side: OrderSide,
        /// Contracts
        contracts: Decimal,
        /// Trigger price
        trigger_price: Decimal,
        /// Trigger direction
        direction: TriggerDirection,
    },
    /// Single-order cancellation
    CancelOrder {
        /// Symbol of the order
        symbol: Symbol,
        /// Cancelled order id
        order_id: String,
    },
    /// Cancel-all for a symbol
    CancelAll {
        /// Symbol cleared
        symbol: Symbol,
    },
}

/// In-memory exchange gateway.
pub struct StubGateway {
    specs: RwLock<Vec<SymbolSpec>>,
    prices: RwLock<Vec<(Symbol, Decimal)>>,
    default_price: Decimal,
    positions: RwLock<Vec<PositionSnapshot>>,
    settlements: RwLock<Vec<SettlementRow>>,
    calls: RwLock<Vec<GatewayCall>>,
    order_seq: AtomicU64,
    fail_next: RwLock<Option<GatewayError>>,
    reject_next: RwLock<Option<(i64, String)>>,
}

impl StubGateway {
    /// Create a stub whose unknown symbols quote at `default_price`.
    pub fn new(default_price: Decimal) -> Self {
        Self {
            specs: RwLock::new(Vec::new()),
            prices: RwLock::new(Vec::new()),
            default_price,
            positions: RwLock::new(Vec::new()),
            settlements: RwLock::new(Vec::new()),
            calls: RwLock::new(Vec::new()),
            order_seq: AtomicU64::new(0),
            fail_next: RwLock::new(None),
            reject_next: RwLock::new(None),
        }
    }

    /// Script the instrument list.
    pub async fn set_instruments(&self, specs: Vec<SymbolSpec>) {
        *self.specs.write().await = specs;
    }

    /// Script a price for one symbol.
    pub async fn set_price(&self, symbol: Symbol, price: Decimal) {
        let mut prices = self.prices.write().await;
        prices.retain(|(s, _)| s != &symbol);
        prices.push((symbol, price));
    }

    /// Script the open-positions answer.
    pub async fn set_positions(&self, positions: Vec<PositionSnapshot>) {
        *self.positions.write().await = positions;
    }

    /// Add a settlement row.
    pub async fn push_settlement(&self, row: SettlementRow) {
        self.settlements.write().await.push(row);
    }

    /// Make the next order-placing call fail at the transport level.
    pub async fn fail_next(&self, error: GatewayError) {
        *self.fail_next.write().await = Some(error);
    }

    /// Make the next order-placing call answer a rejection response.
    pub async fn reject_next(&self, code: i64, message: &str) {
        *self.reject_next.write().await = Some((code, message.to_string()));
    }

    /// Everything that was called, in order.
    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.calls.read().await.clone()
    }

    /// Forget the call log.
    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    /// Number of order-placing calls recorded so far.
    pub async fn placed_order_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    GatewayCall::MarketOrder { .. }
                        | GatewayCall::LimitOrder { .. }
                        | GatewayCall::TriggerOrder { .. }
                )
            })
            .count()
    }

    async fn respond(&self) -> Result<RawOrderResponse, GatewayError> {
        if let Some(error) = self.fail_next.write().await.take() {
            return Err(error);
        }
        if let Some((code, message)) = self.reject_next.write().await.take() {
            return Ok(RawOrderResponse {
                success: false,
                code,
                order_id: None,
                timestamp_ms: Some(Utc::now().timestamp_millis()),
                message: Some(message),
            });
        }
        let n = self.order_seq.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RawOrderResponse {
            success: true,
            code: 0,
            order_id: Some(format!("STUB-{}", n)),
            timestamp_ms: Some(Utc::now().timestamp_millis()),
            message: None,
        })
    }
}

#[async_trait]
impl ExchangeGateway for StubGateway {
    async fn instruments(&self) -> Result<Vec<SymbolSpec>, GatewayError> {
        Ok(self.specs.read().await.clone())
    }

    async fn fair_price(&self, symbol: &Symbol) -> Result<Price, GatewayError> {
        let price = self
            .prices
            .read()
            .await
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, p)| *p)
            .unwrap_or(self.default_price);
        Price::new(price).map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn open_positions(&self) -> Result<Vec<PositionSnapshot>, GatewayError> {
        Ok(self.positions.read().await.clone())
    }

    async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        contracts: Quantity,
        _leverage: u32,
        reduce_only: bool,
    ) -> Result<RawOrderResponse, GatewayError> {
        self.calls.write().await.push(GatewayCall::MarketOrder {
            symbol: symbol.clone(),
            side,
            contracts: contracts.as_decimal(),
            reduce_only,
        });
        self.respond().await
    }

    async fn place_limit_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        contracts: Quantity,
        price: Price,
    ) -> Result<RawOrderResponse, GatewayError> {
        self.calls.write().await.push(GatewayCall::LimitOrder {
            symbol: symbol.clone(),
            side,
            contracts: contracts.as_decimal(),
            price: price.as_decimal(),
        });
        self.respond().await
    }

    async fn place_trigger_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        contracts: Quantity,
        trigger_price: Price,
        direction: TriggerDirection,
    ) -> Result<RawOrderResponse, GatewayError> {
        self.calls.write().await.push(GatewayCall::TriggerOrder {
            symbol: symbol.clone(),
            side,
            contracts: contracts.as_decimal(),
            trigger_price: trigger_price.as_decimal(),
            direction,
        });
        self.respond().await
    }

    async fn cancel_order(
        &self,
        symbol: &Symbol,
        order_id: &str,
    ) -> Result<RawOrderResponse, GatewayError> {
        self.calls.write().await.push(GatewayCall::CancelOrder {
            symbol: symbol.clone(),
            order_id: order_id.to_string(),
        });
        self.respond().await
    }

    async fn cancel_all_orders(&self, symbol: &Symbol) -> Result<RawOrderResponse, GatewayError> {
        self.calls
            .write()
            .await
            .push(GatewayCall::CancelAll { symbol: symbol.clone() });
        self.respond().await
    }

    async fn settlements(
        &self,
        symbol: &Symbol,
        since_ms: i64,
    ) -> Result<Vec<SettlementRow>, GatewayError> {
        Ok(self
            .settlements
            .read()
            .await
            .iter()
            .filter(|row| &row.symbol == symbol && row.settled_at_ms >= since_ms)
            .cloned()
            .collect())
    }
}

/// Build the stub's position snapshot for tests.
pub fn snapshot(symbol: &Symbol, side: Side, contracts: Decimal, hold_price: Decimal, leverage: u32) -> PositionSnapshot {
    PositionSnapshot {
        symbol: symbol.clone(),
        side,
        contracts,
        hold_price,
        leverage,
    }
}

// =============================================================================
// Tests
// =============================================================================
