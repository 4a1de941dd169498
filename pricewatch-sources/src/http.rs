//! Shared HTTP plumbing for the adapters

use chrono::Utc;
use pricewatch_core::PriceReading;
use reqwest::{header::ACCEPT, Client};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::SourceError;

const USER_AGENT: &str = "Pricewatch/1.0";

/// Build the HTTP client shared by every adapter.
///
/// `timeout` bounds each request end to end (connect + body).
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Price and optional 24h change parsed from one upstream response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub price: Decimal,
    /// Percent change over the last 24 hours
    pub change_24h: Option<Decimal>,
}

impl Quote {
    pub fn new(price: Decimal, change_24h: Option<Decimal>) -> Self {
        Self { price, change_24h }
    }
}

/// GET `url` with URL-encoded `query` pairs and decode the body as JSON
pub(crate) async fn get_json(
    client: &Client,
    source_name: &str,
    url: &str,
    query: &[(&str, &str)],
) -> Result<Value, SourceError> {
    debug!("[{}] Fetching {} {:?}", source_name, url, query);

    let response = client
        .get(url)
        .query(query)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                SourceError::unavailable(source_name, "request timed out")
            } else {
                SourceError::unavailable(source_name, format!("request failed: {}", e))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::unavailable(
            source_name,
            format!("HTTP {}", status.as_u16()),
        ));
    }

    response.json::<Value>().await.map_err(|e| {
        if e.is_timeout() {
            SourceError::unavailable(source_name, "response body timed out")
        } else {
            SourceError::malformed(source_name, format!("invalid JSON: {}", e))
        }
    })
}

/// Read a price out of a JSON number or numeric string without going through f64
pub(crate) fn decimal_from_json(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };

    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

/// Turn a parsed quote into a reading stamped now, mapping invalid prices to `Malformed`
pub(crate) fn into_reading(
    source_name: &str,
    asset_id: &str,
    currency: &str,
    quote: Quote,
) -> Result<PriceReading, SourceError> {
    PriceReading::new(asset_id, currency, quote.price, Utc::now(), source_name)
        .map(|reading| reading.with_change_24h(quote.change_24h))
        .map_err(|e| SourceError::malformed(source_name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_decimal_from_number_keeps_precision() {
        assert_eq!(decimal_from_json(&json!(151.23)), Some(dec!(151.23)));
        assert_eq!(decimal_from_json(&json!(64000)), Some(dec!(64000)));
    }

    #[test]
    fn test_decimal_from_string() {
        assert_eq!(decimal_from_json(&json!("0.4521")), Some(dec!(0.4521)));
        assert_eq!(decimal_from_json(&json!("1e-5")), Some(dec!(0.00001)));
    }

    #[test]
    fn test_decimal_from_non_numeric() {
        assert_eq!(decimal_from_json(&json!(null)), None);
        assert_eq!(decimal_from_json(&json!("n/a")), None);
        assert_eq!(decimal_from_json(&json!({"usd": 1})), None);
    }

    #[test]
    fn test_negative_price_is_malformed() {
        let err = into_reading("test", "solana", "usd", Quote::new(dec!(-3), None)).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    mod over_http {
        use super::*;
        use crate::{CoinGeckoSource, CoinGeckoTokenSource, JupiterSource, PriceSource};
        use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
        use std::collections::HashMap;

        const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

        /// Serve `router` on an ephemeral local port and return its base URL
        async fn serve(router: Router) -> String {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });
            format!("http://{}", addr)
        }

        fn client(timeout: Duration) -> Client {
            build_http_client(timeout).unwrap()
        }

        async fn coingecko(router: Router) -> CoinGeckoSource {
            CoinGeckoSource::with_base_url(client(Duration::from_secs(2)), serve(router).await)
        }

        #[tokio::test]
        async fn test_error_status_is_unavailable() {
            let source = coingecko(Router::new().route(
                "/simple/price",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "try later") }),
            ))
            .await;

            let err = source.fetch("solana", "usd").await.unwrap_err();
            assert_eq!(err, SourceError::unavailable("coingecko", "HTTP 503"));
        }

        #[tokio::test]
        async fn test_non_json_body_is_malformed() {
            let source = coingecko(Router::new().route(
                "/simple/price",
                get(|| async { "<html>rate limited</html>" }),
            ))
            .await;

            let err = source.fetch("solana", "usd").await.unwrap_err();
            assert!(matches!(err, SourceError::Malformed { .. }));
        }

        #[tokio::test]
        async fn test_body_without_price_is_malformed() {
            let source = coingecko(Router::new().route(
                "/simple/price",
                get(|| async { Json(json!({})) }),
            ))
            .await;

            let err = source.fetch("solana", "usd").await.unwrap_err();
            assert!(matches!(err, SourceError::Malformed { .. }));
        }

        #[tokio::test]
        async fn test_negative_upstream_price_is_malformed() {
            let source = coingecko(Router::new().route(
                "/simple/price",
                get(|| async { Json(json!({ "solana": { "usd": -151.2 } })) }),
            ))
            .await;

            let err = source.fetch("solana", "usd").await.unwrap_err();
            assert!(matches!(err, SourceError::Malformed { .. }));
        }

        #[tokio::test]
        async fn test_client_timeout_is_unavailable() {
            let base_url = serve(Router::new().route(
                "/simple/price",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Json(json!({ "solana": { "usd": 150 } }))
                }),
            ))
            .await;
            let source = CoinGeckoSource::with_base_url(client(Duration::from_millis(100)), base_url);

            let err = source.fetch("solana", "usd").await.unwrap_err();
            assert!(matches!(err, SourceError::Unavailable { .. }));
        }

        #[tokio::test]
        async fn test_query_values_are_encoded() {
            // echo the decoded query back as the price entry key
            let source = coingecko(Router::new().route(
                "/simple/price",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    assert_eq!(params.get("vs_currencies").map(String::as_str), Some("usd"));
                    assert_eq!(params.get("include_24hr_change").map(String::as_str), Some("true"));
                    let id = params.get("ids").cloned().unwrap_or_default();
                    Json(json!({ id: { "usd": 1.5, "usd_24h_change": 2.25 } }))
                }),
            ))
            .await;

            let reading = source.fetch("odd&vs_currencies=eur", "usd").await.unwrap();
            assert_eq!(reading.asset_id(), "odd&vs_currencies=eur");
            assert_eq!(reading.price(), dec!(1.5));
            assert_eq!(reading.change_24h(), Some(dec!(2.25)));
        }

        #[tokio::test]
        async fn test_mint_sources_carry_24h_change() {
            let base_url = serve(
                Router::new()
                    .route(
                        "/price/v2",
                        get(|| async {
                            Json(json!({
                                "data": { SOL_MINT: { "price": "150.815", "priceChange24h": -4.5 } }
                            }))
                        }),
                    )
                    .route(
                        "/simple/token_price/solana",
                        get(|| async {
                            Json(json!({
                                SOL_MINT.to_lowercase(): { "usd": 149.9, "usd_24h_change": 1.75 }
                            }))
                        }),
                    ),
            )
            .await;
            let mints = HashMap::from([("solana".to_string(), SOL_MINT.to_string())]);

            let jupiter =
                JupiterSource::with_base_url(client(Duration::from_secs(2)), base_url.clone(), mints.clone());
            let reading = jupiter.fetch("solana", "usd").await.unwrap();
            assert_eq!(reading.price(), dec!(150.815));
            assert_eq!(reading.change_24h(), Some(dec!(-4.5)));

            let token = CoinGeckoTokenSource::with_base_url(client(Duration::from_secs(2)), base_url, mints);
            let reading = token.fetch("solana", "usd").await.unwrap();
            assert_eq!(reading.price(), dec!(149.9));
            assert_eq!(reading.change_24h(), Some(dec!(1.75)));
        }
    }
}
