//! API route definitions

mod alerts;
mod health;
mod prices;

use axum::Router;
use serde::Serialize;

use crate::AppState;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(alerts::routes())
        .merge(prices::routes())
        .merge(health::routes())
}

#[cfg(test)]
pub(crate) mod test_state {
    use async_trait::async_trait;
    use chrono::Utc;
    use pricewatch_core::PriceReading;
    use pricewatch_services::{
        AlertEvaluator, LogNotifier, PriceCache, PriceResolver, PricewatchConfig,
        ResolverConfig, Scheduler, SqliteAlertStore,
    };
    use pricewatch_sources::{PriceSource, SourceError};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::AppState;

    /// Source that prices every asset it knows at a fixed value, down 1.25% on the day
    pub struct FixedSource(pub HashMap<String, Decimal>);

    #[async_trait]
    impl PriceSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self, asset_id: &str, currency: &str) -> Result<PriceReading, SourceError> {
            match self.0.get(asset_id) {
                Some(price) => PriceReading::new(asset_id, currency, *price, Utc::now(), "fixed")
                    .map(|reading| reading.with_change_24h(Some(dec!(-1.25))))
                    .map_err(|e| SourceError::malformed("fixed", e.to_string())),
                None => Err(SourceError::unavailable("fixed", "unknown asset")),
            }
        }
    }

    /// State tracking solana and bitcoin, with only solana priced upstream
    pub fn state(solana: Decimal) -> AppState {
        let config = PricewatchConfig::from_lookup(|key| match key {
            "TRACKED_ASSETS" => Some("solana,bitcoin".to_string()),
            _ => None,
        })
        .unwrap();

        let store = Arc::new(SqliteAlertStore::new_in_memory().unwrap());
        let cache = Arc::new(PriceCache::new());
        let source = FixedSource(HashMap::from([("solana".to_string(), solana)]));
        let resolver = Arc::new(PriceResolver::new(
            vec![Arc::new(source) as Arc<dyn PriceSource>],
            None,
            cache.clone(),
            ResolverConfig::default(),
        ));
        let evaluator = Arc::new(AlertEvaluator::new(store.clone(), Arc::new(LogNotifier)));
        let scheduler = Arc::new(Scheduler::new(resolver, evaluator, config.scheduler_config()));

        AppState {
            config: Arc::new(config),
            alert_store: store,
            price_cache: cache,
            scheduler,
        }
    }
}
