//! Price endpoints
//!
//! Read-only views over the price cache. These never trigger an upstream
//! fetch; prices only move when the scheduler runs a pass.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use pricewatch_services::CacheLookup;
use rust_decimal::Decimal;
use serde::Serialize;

use super::ErrorResponse;
use crate::AppState;

/// Last known price for one asset
#[derive(Debug, Serialize)]
pub struct PriceView {
    pub asset_id: String,
    pub currency: String,
    pub price: Decimal,
    pub source: String,
    pub observed_at: DateTime<Utc>,
    /// 24h change in percent, when the source reported one
    pub change_24h: Option<Decimal>,
    /// Past its cache TTL; alerts are not evaluated against it
    pub stale: bool,
}

/// Response for listing prices
#[derive(Debug, Serialize)]
pub struct PricesResponse {
    pub currency: String,
    pub prices: Vec<PriceView>,
    /// Tracked assets with no reading yet
    pub missing: Vec<String>,
}

/// Create price routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/prices", get(list_prices))
        .route("/prices/{asset_id}", get(get_price))
}

fn view(state: &AppState, asset_id: &str) -> Option<PriceView> {
    let (reading, stale) = match state.price_cache.lookup(asset_id, &state.config.currency) {
        CacheLookup::Fresh(reading) => (reading, false),
        CacheLookup::Stale(reading) => (reading, true),
        CacheLookup::Absent => return None,
    };

    Some(PriceView {
        asset_id: reading.asset_id().to_string(),
        currency: reading.currency().to_string(),
        price: reading.price(),
        source: reading.source().to_string(),
        observed_at: reading.observed_at(),
        change_24h: reading.change_24h(),
        stale,
    })
}

/// Last known price of every tracked asset
async fn list_prices(State(state): State<AppState>) -> impl IntoResponse {
    let mut prices = Vec::new();
    let mut missing = Vec::new();

    for asset_id in &state.config.tracked_assets {
        match view(&state, asset_id) {
            Some(price) => prices.push(price),
            None => missing.push(asset_id.clone()),
        }
    }

    Json(PricesResponse {
        currency: state.config.currency.clone(),
        prices,
        missing,
    })
}

/// Last known price of one asset
async fn get_price(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> impl IntoResponse {
    let asset_id = asset_id.to_lowercase();

    match view(&state, &asset_id) {
        Some(price) => (StatusCode::OK, Json(price)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No price available for {}", asset_id),
            }),
        )
            .into_response(),
    }
}
