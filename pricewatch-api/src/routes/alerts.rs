//! Alert management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use pricewatch_core::{Alert, AlertId, Direction, NewAlert, PricewatchError};
use pricewatch_services::{AlertStoreError, PricewatchConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::ErrorResponse;
use crate::AppState;

/// Request body for creating an alert
#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub owner_id: String,
    pub asset_id: String,
    pub target_price: Decimal,
    /// "above" or "below"
    pub direction: String,
}

/// Query parameters for listing alerts
#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    pub owner_id: Option<String>,
}

/// Response for listing alerts
#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
    pub count: usize,
}

/// Create alert routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(list_alerts).post(create_alert))
        .route("/alerts/{id}", get(get_alert))
}

/// Check a create request against the running configuration
pub fn validate_new_alert(
    req: CreateAlertRequest,
    config: &PricewatchConfig,
) -> Result<NewAlert, PricewatchError> {
    let owner_id = req.owner_id.trim().to_string();
    if owner_id.is_empty() {
        return Err(PricewatchError::invalid_input("owner_id is required"));
    }

    let asset_id = req.asset_id.trim().to_lowercase();
    if !config.is_tracked(&asset_id) {
        return Err(PricewatchError::invalid_input(format!(
            "{} is not a tracked asset (tracked: {})",
            asset_id,
            config.tracked_assets.join(", ")
        )));
    }

    if req.target_price <= Decimal::ZERO {
        return Err(PricewatchError::invalid_input(
            "target_price must be greater than zero",
        ));
    }

    let direction: Direction = req.direction.parse()?;

    Ok(NewAlert {
        owner_id,
        asset_id,
        target_price: req.target_price,
        direction,
    })
}

fn bad_request(message: String) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
}

fn storage_error(e: AlertStoreError) -> axum::response::Response {
    error!("Alert storage failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Alert storage unavailable".to_string(),
        }),
    )
        .into_response()
}

/// Create a price alert
async fn create_alert(
    State(state): State<AppState>,
    Json(req): Json<CreateAlertRequest>,
) -> impl IntoResponse {
    let new_alert = match validate_new_alert(req, &state.config) {
        Ok(alert) => alert,
        Err(e) => return bad_request(e.to_string()),
    };

    let id = match state.alert_store.create(&new_alert) {
        Ok(id) => id,
        Err(e) => return storage_error(e),
    };

    info!(
        "Created alert {} for {}: {} {} {}",
        id, new_alert.owner_id, new_alert.asset_id, new_alert.direction, new_alert.target_price
    );

    match state.alert_store.get(id) {
        Ok(Some(alert)) => (StatusCode::CREATED, Json(alert)).into_response(),
        Ok(None) => storage_error(AlertStoreError::NotFound(id)),
        Err(e) => storage_error(e),
    }
}

/// List an owner's pending alerts
async fn list_alerts(
    State(state): State<AppState>,
    Query(params): Query<ListAlertsQuery>,
) -> impl IntoResponse {
    let Some(owner_id) = params.owner_id.filter(|o| !o.trim().is_empty()) else {
        return bad_request("owner_id query parameter is required".to_string());
    };

    match state.alert_store.list_pending_for_owner(owner_id.trim()) {
        Ok(alerts) => {
            let count = alerts.len();
            (StatusCode::OK, Json(AlertsResponse { alerts, count })).into_response()
        }
        Err(e) => storage_error(e),
    }
}

/// Get a single alert, fired or not
async fn get_alert(State(state): State<AppState>, Path(id): Path<AlertId>) -> impl IntoResponse {
    match state.alert_store.get(id) {
        Ok(Some(alert)) => (StatusCode::OK, Json(alert)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Alert not found: {}", id),
            }),
        )
            .into_response(),
        Err(e) => storage_error(e),
    }
}
