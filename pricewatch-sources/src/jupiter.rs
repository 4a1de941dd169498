//! Jupiter price source
//!
//! Jupiter quotes SPL tokens by mint address in USD. Assets without a
//! configured mint are skipped without a request.

use async_trait::async_trait;
use pricewatch_core::PriceReading;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use tracing::instrument;

use crate::error::SourceError;
use crate::http::{decimal_from_json, get_json, into_reading, Quote};
use crate::source::PriceSource;

const JUPITER_API_BASE: &str = "https://api.jup.ag";

/// Jupiter `price/v2` adapter
#[derive(Clone)]
pub struct JupiterSource {
    http: Client,
    base_url: String,
    /// asset id -> SPL mint address
    mints: HashMap<String, String>,
}

impl JupiterSource {
    pub const NAME: &'static str = "jupiter";

    pub fn new(http: Client, mints: HashMap<String, String>) -> Self {
        Self::with_base_url(http, JUPITER_API_BASE, mints)
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
impl PriceSource for JupiterSource {
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
        let mint = self.mints.get(asset_id).ok_or_else(|| {
            SourceError::unavailable(Self::NAME, format!("no mint address for {}", asset_id))
        })?;

        let url = format!("{}/price/v2", self.base_url);
        let body = get_json(&self.http, Self::NAME, &url, &[("ids", mint.as_str())]).await?;
        let quote = parse_price_v2(&body, mint)
            .map_err(|reason| SourceError::malformed(Self::NAME, reason))?;

        into_reading(Self::NAME, asset_id, currency, quote)
    }
}

/// Parse `{ "data": { "<mint>": { "price": "<string>", "priceChange24h": <number> } } }`.
///
/// Unknown mints come back as `null` entries. `priceChange24h` is optional.
pub fn parse_price_v2(body: &Value, mint: &str) -> Result<Quote, String> {
    let entry = body
        .get("data")
        .and_then(|data| data.get(mint))
        .filter(|entry| !entry.is_null())
        .ok_or_else(|| format!("no price entry for mint {}", mint))?;
    let value = entry
        .get("price")
        .ok_or_else(|| format!("missing price for mint {}", mint))?;

    let price = decimal_from_json(value).ok_or_else(|| format!("non-numeric price: {}", value))?;
    let change_24h = entry.get("priceChange24h").and_then(decimal_from_json);

    Ok(Quote::new(price, change_24h))
}
