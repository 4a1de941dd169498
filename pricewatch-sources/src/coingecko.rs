//! CoinGecko price sources
//!
//! Two endpoints are wrapped: `simple/price`, keyed by CoinGecko coin id, and
//! `simple/token_price/solana`, keyed by SPL mint address. The latter is the
//! last resort once every other source has failed.

use async_trait::async_trait;
use pricewatch_core::PriceReading;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use tracing::instrument;

use crate::error::SourceError;
use crate::http::{decimal_from_json, get_json, into_reading, Quote};
use crate::source::PriceSource;

/// Base URL for the public CoinGecko API
pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko `simple/price` adapter
#[derive(Clone)]
pub struct CoinGeckoSource {
    http: Client,
    base_url: String,
}

impl CoinGeckoSource {
    pub const NAME: &'static str = "coingecko";

    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, COINGECKO_API_BASE)
    }

    /// Point at a different deployment (e.g. the pro API)
    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip(self))]
    async fn fetch(&self, asset_id: &str, currency: &str) -> Result<PriceReading, SourceError> {
        let url = format!("{}/simple/price", self.base_url);
        let query = [
            ("ids", asset_id),
            ("vs_currencies", currency),
            ("include_24hr_change", "true"),
        ];
        let body = get_json(&self.http, Self::NAME, &url, &query).await?;
        let quote = parse_simple_price(&body, asset_id, currency)
            .map_err(|reason| SourceError::malformed(Self::NAME, reason))?;

        into_reading(Self::NAME, asset_id, currency, quote)
    }
}

/// Parse `{ "<id>": { "<currency>": <number>, "<currency>_24h_change": <number> } }`
///
/// The change field is optional; it is only present when requested and
/// CoinGecko has enough history.
pub fn parse_simple_price(body: &Value, key: &str, currency: &str) -> Result<Quote, String> {
    let entry = body
        .get(key)
        .ok_or_else(|| format!("no entry for {}", key))?;
    let value = entry
        .get(currency)
        .ok_or_else(|| format!("no {} quote for {}", currency, key))?;

    let price = decimal_from_json(value).ok_or_else(|| format!("non-numeric price: {}", value))?;
    let change_24h = entry
        .get(format!("{}_24h_change", currency))
        .and_then(decimal_from_json);

    Ok(Quote::new(price, change_24h))
}

/// CoinGecko `simple/token_price/solana` adapter, keyed by mint address
#[derive(Clone)]
pub struct CoinGeckoTokenSource {
    http: Client,
    base_url: String,
    /// asset id -> SPL mint address
    mints: HashMap<String, String>,
}

impl CoinGeckoTokenSource {
    pub const NAME: &'static str = "coingecko-token";

    pub fn new(http: Client, mints: HashMap<String, String>) -> Self {
        Self::with_base_url(http, COINGECKO_API_BASE, mints)
    }

    pub fn with_base_url(
        http: Client,
        base_url: impl Into<String>,
        mints: HashMap<String, String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            mints,
        }
    }
}

#[async_trait]
impl PriceSource for CoinGeckoTokenSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip(self))]
    async fn fetch(&self, asset_id: &str, currency: &str) -> Result<PriceReading, SourceError> {
        let mint = self.mints.get(asset_id).ok_or_else(|| {
            SourceError::unavailable(Self::NAME, format!("no mint address for {}", asset_id))
        })?;

        let url = format!("{}/simple/token_price/solana", self.base_url);
        let query = [
            ("contract_addresses", mint.as_str()),
            ("vs_currencies", currency),
            ("include_24hr_change", "true"),
        ];
        let body = get_json(&self.http, Self::NAME, &url, &query).await?;

        // Contract addresses come back lowercased
        let quote = parse_simple_price(&body, &mint.to_lowercase(), currency)
            .map_err(|reason| SourceError::malformed(Self::NAME, reason))?;

        into_reading(Self::NAME, asset_id, currency, quote)
    }
}
