//! CoinCap price source
//!
//! CoinCap uses the same slug-style ids as CoinGecko for the major coins but
//! only quotes USD.

use async_trait::async_trait;
use pricewatch_core::PriceReading;
use reqwest::Client;
use serde_json::Value;
use tracing::instrument;

use crate::error::SourceError;
use crate::http::{decimal_from_json, get_json, into_reading, Quote};
use crate::source::PriceSource;

const COINCAP_API_BASE: &str = "https://api.coincap.io/v2";

/// CoinCap `assets/{id}` adapter
#[derive(Clone)]
pub struct CoinCapSource {
    http: Client,
    base_url: String,
}

impl CoinCapSource {
    pub const NAME: &'static str = "coincap";

    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, COINCAP_API_BASE)
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PriceSource for CoinCapSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip(self))]
    async fn fetch(&self, asset_id: &str, currency: &str) -> Result<PriceReading, SourceError> {
        if !currency.eq_ignore_ascii_case("usd") {
            return Err(SourceError::unavailable(
                Self::NAME,
                format!("only usd quotes are available, requested {}", currency),
            ));
        }

        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SourceError::unavailable(Self::NAME, format!("bad base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::unavailable(Self::NAME, "base url cannot hold a path"))?
            .pop_if_empty()
            .extend(["assets", asset_id]);

        let body = get_json(&self.http, Self::NAME, url.as_str(), &[]).await?;
        let quote =
            parse_asset(&body).map_err(|reason| SourceError::malformed(Self::NAME, reason))?;

        into_reading(Self::NAME, asset_id, currency, quote)
    }
}

/// Parse `{ "data": { "priceUsd": "<string>", "changePercent24Hr": "<string>" } }`
pub fn parse_asset(body: &Value) -> Result<Quote, String> {
    let data = body
        .get("data")
        .ok_or_else(|| "missing data".to_string())?;
    let value = data
        .get("priceUsd")
        .ok_or_else(|| "missing data.priceUsd".to_string())?;

    let price = decimal_from_json(value).ok_or_else(|| format!("non-numeric priceUsd: {}", value))?;
    let change_24h = data.get("changePercent24Hr").and_then(decimal_from_json);

    Ok(Quote::new(price, change_24h))
}
