//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::Utc;
use pricewatch_services::{CacheStats, SchedulerStatus};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    scheduler: SchedulerStatus,
    cache: CacheStats,
    sources: Vec<String>,
}

/// A scheduler that has not ticked for this many intervals is degraded
const MISSED_INTERVALS_DEGRADED: i64 = 2;

fn is_healthy(status: &SchedulerStatus) -> bool {
    if !status.running {
        return false;
    }
    match status.last_tick_at {
        Some(last) => {
            let limit = chrono::Duration::seconds(
                (status.interval_secs as i64).saturating_mul(MISSED_INTERVALS_DEGRADED),
            );
            Utc::now() - last <= limit
        }
        // first tick fires on start; a missing one means the loop never ran
        None => false,
    }
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let scheduler = state.scheduler.status();
    let healthy = is_healthy(&scheduler);

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        scheduler,
        cache: state.price_cache.stats(),
        sources: state.scheduler.resolver().source_names(),
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(response))
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}
