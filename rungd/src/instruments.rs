//! Instrument cache.
//!
//! Contract specs are fetched in bulk and cached so dispatch never blocks
//! on a spec lookup. A background task refreshes the cache on an interval;
//! a refresh failure keeps the previous snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use rung_domain::{Symbol, SymbolSpec};
use rung_exec::ExchangeGateway;

/// Shared cache of contract specs, keyed by symbol pair.
#[derive(Default)]
pub struct InstrumentCache {
    specs: RwLock<HashMap<String, SymbolSpec>>,
}

impl InstrumentCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the spec for a symbol.
    pub async fn get(&self, symbol: &Symbol) -> Option<SymbolSpec> {
        self.specs.read().await.get(&symbol.to_string()).cloned()
    }

    /// Number of cached instruments.
    pub async fn len(&self) -> usize {
        self.specs.read().await.len()
    }

    /// True when nothing has been cached yet.
    pub async fn is_empty(&self) -> bool {
        self.specs.read().await.is_empty()
    }

    /// Replace the cache with a fresh instrument list from the gateway.
    ///
    /// Failures are logged and leave the previous snapshot in place.
    pub async fn refresh<G: ExchangeGateway>(&self, gateway: &G) {
        match gateway.instruments().await {
            Ok(specs) => {
                let mut cache = self.specs.write().await;
                cache.clear();
                for spec in specs {
                    cache.insert(spec.symbol.to_string(), spec);
                }
                debug!(count = cache.len(), "Instrument cache refreshed");
            }
            Err(e) => warn!(error = %e, "Instrument refresh failed, keeping stale cache"),
        }
    }

    /// Spawn the periodic refresh task. Runs one refresh immediately.
    pub fn spawn_refresh<G: ExchangeGateway + 'static>(
        self: Arc<Self>,
        gateway: Arc<G>,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                self.refresh(gateway.as_ref()).await;
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rung_exec::StubGateway;
    use rust_decimal_macros::dec;

    fn spec(pair: &str) -> SymbolSpec {
        let symbol = Symbol::from_pair(pair).unwrap();
        SymbolSpec::new(symbol, dec!(0.0001), dec!(1), 0, 1, 125).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_populates_cache() {
        let gateway = StubGateway::new(dec!(100));
        gateway.set_instruments(vec![spec("BTC_USDT"), spec("ETH_USDT")]).await;

        let cache = InstrumentCache::new();
        assert!(cache.is_empty().await);

        cache.refresh(&gateway).await;
        assert_eq!(cache.len().await, 2);

        let btc = Symbol::from_pair("BTC_USDT").unwrap();
        assert!(cache.get(&btc).await.is_some());
        let sol = Symbol::from_pair("SOL_USDT").unwrap();
        assert!(cache.get(&sol).await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let gateway = StubGateway::new(dec!(100));
        gateway.set_instruments(vec![spec("BTC_USDT")]).await;

        let cache = InstrumentCache::new();
        cache.refresh(&gateway).await;
        assert_eq!(cache.len().await, 1);

        gateway.set_instruments(vec![spec("ETH_USDT"), spec("SOL_USDT")]).await;
        cache.refresh(&gateway).await;
        assert_eq!(cache.len().await, 2);

        let btc = Symbol::from_pair("BTC_USDT").unwrap();
        assert!(cache.get(&btc).await.is_none());
    }

    #[tokio::test]
    async fn test_spawn_refresh_stops_on_cancel() {
        let gateway = Arc::new(StubGateway::new(dec!(100)));
        gateway.set_instruments(vec![spec("BTC_USDT")]).await;

        let cache = Arc::new(InstrumentCache::new());
        let token = CancellationToken::new();
        let task = cache.clone().spawn_refresh(
            gateway,
            Duration::from_millis(10),
            token.clone(),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.len().await, 1);

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
