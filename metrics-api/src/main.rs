// metrics-api/src/main.rs

//! Metrics API binary.
//!
//! This binary exposes a small HTTP API on top of the `beacon-metrics`
//! crate so that test harnesses can sample per-slot metrics on demand:
//!
//! - `GET /health`
//! - `GET /clients`
//! - `GET /clients/{id}/metrics/{kind}/{slot}`
//! - `GET /clients/{id}/ttd`, `PUT /clients/{id}/ttd`
//!
//! It also runs the Prometheus exporter on `/metrics`.

mod config;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use beacon_metrics::{CollectorConfig, HttpBeaconClients, MetricsRegistry, run_prometheus_http_server};
use config::ApiConfig;
use routes::{clients, health, metrics};
use state::{AppState, SharedState};

fn main() {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("metrics_api=info,beacon_metrics=info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let api_cfg = ApiConfig::from_env()?;
    let cfg = CollectorConfig::from_env().map_err(|e| format!("failed to load config: {e}"))?;

    // ---------------------------
    // Beacon clients
    // ---------------------------

    // The blocking HTTP clients are built (and finally dropped) outside the
    // async runtime; handlers reach them through `spawn_blocking`.
    let clients = Arc::new(
        HttpBeaconClients::connect(&cfg.beacon, cfg.polling)
            .map_err(|e| format!("failed to register beacon clients: {e}"))?,
    );
    tracing::info!(clients = %clients, "registered beacon clients");

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start tokio runtime: {e}"))?;

    let app_state: SharedState = Arc::new(AppState {
        clients: clients.clone(),
        metrics: metrics.clone(),
    });

    let res = runtime.block_on(serve(api_cfg, cfg, app_state, metrics));

    // Let background tasks go before the last client handle is dropped.
    runtime.shutdown_background();
    drop(clients);
    res
}

async fn serve(
    api_cfg: ApiConfig,
    cfg: CollectorConfig,
    app_state: SharedState,
    registry: Arc<MetricsRegistry>,
) -> Result<(), String> {
    // ---------------------------
    // Metrics exporter
    // ---------------------------

    if cfg.metrics.enabled {
        let addr = cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(registry, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // HTTP router
    // ---------------------------

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/clients", get(clients::list_clients))
        .route(
            "/clients/{id}/ttd",
            get(clients::get_ttd).put(clients::set_ttd),
        )
        .route("/clients/{id}/metrics/{kind}/{slot}", get(metrics::get_metric))
        .with_state(app_state);

    tracing::info!("metrics API listening on http://{}", api_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
