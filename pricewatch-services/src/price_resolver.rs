//! Price Resolver
//!
//! Resolves the current price of an asset by walking an ordered chain of
//! price sources, one at a time, and caching the first success. Later
//! sources are strictly fallbacks, so they are never called concurrently
//! with earlier ones.

use futures::future::join_all;
use pricewatch_core::PriceReading;
use pricewatch_sources::{PriceSource, SourceError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::price_cache::{PriceCache, DEFAULT_CACHE_TTL};

/// Default bound on a single upstream call
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolved prices for one pass, keyed by asset id
pub type PriceSet = HashMap<String, PriceReading>;

/// Resolver tuning
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// How long a resolved reading is served from cache
    pub cache_ttl: Duration,
    /// Upper bound on each source call
    pub source_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }
}

/// Outcome of resolving several assets at once
#[derive(Debug, Clone, Default)]
pub struct ResolvedPrices {
    pub prices: PriceSet,
    /// Assets that no source could price this time
    pub skipped: Vec<String>,
}

/// Sequential fallback chain in front of the price cache
pub struct PriceResolver {
    sources: Vec<Arc<dyn PriceSource>>,
    /// Tried only after every primary source failed
    fallback: Option<Arc<dyn PriceSource>>,
    cache: Arc<PriceCache>,
    config: ResolverConfig,
}

impl PriceResolver {
    pub fn new(
        sources: Vec<Arc<dyn PriceSource>>,
        fallback: Option<Arc<dyn PriceSource>>,
        cache: Arc<PriceCache>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            sources,
            fallback,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<PriceCache> {
        &self.cache
    }

    /// Names of the configured sources in the order they are tried
    pub fn source_names(&self) -> Vec<String> {
        self.chain().map(|s| s.name().to_string()).collect()
    }

    fn chain(&self) -> impl Iterator<Item = &Arc<dyn PriceSource>> {
        self.sources.iter().chain(self.fallback.iter())
    }

    /// Resolve one asset.
    ///
    /// A fresh cache entry short-circuits the chain. On total failure the
    /// previous cache entry is left in place and reported as `last_known`.
    pub async fn resolve(&self, asset_id: &str, currency: &str) -> Result<PriceReading, ResolveError> {
        if let Some(reading) = self.cache.get(asset_id, currency) {
            debug!("Cache hit for {}/{}", asset_id, currency);
            return Ok(reading);
        }
        self.refresh(asset_id, currency).await
    }

    /// Query the chain even if the cache holds a fresh entry.
    ///
    /// Used by the scheduled pass, whose interval normally matches the cache
    /// TTL; going through the fresh check there would reuse the previous
    /// pass's price every other tick.
    pub async fn refresh(&self, asset_id: &str, currency: &str) -> Result<PriceReading, ResolveError> {
        let primaries = self.sources.len();
        for (position, source) in self.chain().enumerate() {
            match self.fetch_bounded(source.as_ref(), asset_id, currency).await {
                Ok(reading) => {
                    if position >= primaries {
                        info!(
                            "Resolved {}/{} = {} via final fallback {}",
                            asset_id,
                            currency,
                            reading.price(),
                            source.name()
                        );
                    } else {
                        debug!(
                            "Resolved {}/{} = {} via {}",
                            asset_id,
                            currency,
                            reading.price(),
                            source.name()
                        );
                    }
                    self.cache.put(reading.clone(), self.config.cache_ttl);
                    return Ok(reading);
                }
                Err(e) => {
                    warn!("Price source failed for {}/{}: {}", asset_id, currency, e);
                }
            }
        }

        Err(ResolveError::AllSourcesExhausted {
            asset_id: asset_id.to_string(),
            currency: currency.to_string(),
            last_known: self.cache.last_known(asset_id, currency),
        })
    }

    /// Resolve several assets concurrently. Each asset still walks its own
    /// chain sequentially. Assets that fail are listed in `skipped`.
    pub async fn resolve_many(&self, asset_ids: &[String], currency: &str) -> ResolvedPrices {
        let results = join_all(asset_ids.iter().map(|asset_id| async move {
            (asset_id, self.resolve(asset_id, currency).await)
        }))
        .await;
        collect_resolved(results)
    }

    /// [`PriceResolver::refresh`] for several assets concurrently
    pub async fn refresh_many(&self, asset_ids: &[String], currency: &str) -> ResolvedPrices {
        let results = join_all(asset_ids.iter().map(|asset_id| async move {
            (asset_id, self.refresh(asset_id, currency).await)
        }))
        .await;
        collect_resolved(results)
    }

    async fn fetch_bounded(
        &self,
        source: &dyn PriceSource,
        asset_id: &str,
        currency: &str,
    ) -> Result<PriceReading, SourceError> {
        match tokio::time::timeout(self.config.source_timeout, source.fetch(asset_id, currency)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::unavailable(
                source.name(),
                format!("timed out after {:?}", self.config.source_timeout),
            )),
        }
    }
}

fn collect_resolved(results: Vec<(&String, Result<PriceReading, ResolveError>)>) -> ResolvedPrices {
    let mut resolved = ResolvedPrices::default();
    for (asset_id, result) in results {
        match result {
            Ok(reading) => {
                resolved.prices.insert(asset_id.clone(), reading);
            }
            Err(e) => {
                warn!("Skipping {} this cycle: {}", asset_id, e);
                resolved.skipped.push(asset_id.clone());
            }
        }
    }
    resolved
}

/// Errors from price resolution
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("All price sources exhausted for {asset_id}/{currency}")]
    AllSourcesExhausted {
        asset_id: String,
        currency: String,
        /// Stale reading still held by the cache, if any
        last_known: Option<PriceReading>,
    },
}
