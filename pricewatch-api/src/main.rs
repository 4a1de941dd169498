//! Pricewatch API Server
//!
//! Hosts the price refresh scheduler and exposes alert management over HTTP.

mod routes;

use anyhow::Context;
use axum::{
    http::{header, Method},
    Router,
};
use pricewatch_services::{
    AlertEvaluator, AlertStore, DiscordNotifier, LogNotifier, Notifier, PriceCache,
    PriceResolver, PricewatchConfig, Scheduler, SqliteAlertStore,
};
use pricewatch_sources::build_http_client;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PricewatchConfig>,
    pub alert_store: Arc<dyn AlertStore>,
    pub price_cache: Arc<PriceCache>,
    pub scheduler: Arc<Scheduler>,
}

/// Build the HTTP router over shared state
pub fn app(state: AppState) -> Router {
    // Configure CORS for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,pricewatch_api=debug,pricewatch_services=debug")
        }))
        .init();

    info!("Starting Pricewatch API");

    let config = Arc::new(PricewatchConfig::from_env().context("Invalid configuration")?);
    info!(
        "Tracking {} assets in {}: {}",
        config.tracked_assets.len(),
        config.currency,
        config.tracked_assets.join(", ")
    );

    // Alert storage is required; without it nothing can fire
    info!("Initializing alert storage at: {}", config.alerts_db_path.display());
    let alert_store: Arc<dyn AlertStore> = Arc::new(
        SqliteAlertStore::new(&config.alerts_db_path).context("Failed to initialize alert storage")?,
    );

    let notifier: Arc<dyn Notifier> = match &config.discord_bot_token {
        Some(token) => {
            info!("Discord notifications enabled");
            Arc::new(DiscordNotifier::new(token.clone()))
        }
        None => {
            warn!("DISCORD_BOT_TOKEN not set - fired alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };

    // Price sources, fallback chain and cache
    let http = build_http_client(config.source_timeout).context("Failed to build HTTP client")?;
    let (sources, fallback) = config.build_sources(&http);
    let price_cache = Arc::new(PriceCache::new());
    let resolver = Arc::new(PriceResolver::new(
        sources,
        fallback,
        price_cache.clone(),
        config.resolver_config(),
    ));
    info!("Price source chain: {}", resolver.source_names().join(" -> "));

    let evaluator = Arc::new(AlertEvaluator::new(alert_store.clone(), notifier));
    let scheduler = Arc::new(Scheduler::new(resolver, evaluator, config.scheduler_config()));

    // First tick fires immediately, so prices are warm shortly after startup
    let scheduler_handle = Arc::clone(&scheduler).start();

    let state = AppState {
        config: config.clone(),
        alert_store,
        price_cache,
        scheduler: scheduler.clone(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    if let Err(e) = scheduler_handle.await {
        warn!("Scheduler task ended abnormally: {}", e);
    }
    info!("Pricewatch API stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
