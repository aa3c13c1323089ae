// src/main.rs
//
// Collector binary that wires up the library:
//
// - beacon clients registered from BEACON_URLS
// - Prometheus metrics exporter on /metrics
// - one worker thread per client walking closed slots and resolving every
//   configured metric kind for each of them.

use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

use beacon_metrics::{
    CollectorConfig, HttpBeaconClient, HttpBeaconClients, MetricKind, MetricsRegistry,
    run_prometheus_http_server,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("beacon_metrics=info")),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("fatal error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cfg = CollectorConfig::from_env().map_err(|e| format!("failed to load config: {e}"))?;

    // ---------------------------
    // Metrics registry + exporter
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    // The exporter is the only async component; clients block on their own
    // threads.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start tokio runtime: {e}"))?;

    if cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        runtime.spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Beacon clients
    // ---------------------------

    let clients = HttpBeaconClients::connect(&cfg.beacon, cfg.polling)
        .map_err(|e| format!("failed to register beacon clients: {e}"))?;

    tracing::info!(
        clients = %clients,
        kinds = ?cfg.kinds,
        "starting collector"
    );

    // ---------------------------
    // Per-client collection loops
    // ---------------------------

    std::thread::scope(|scope| {
        for client in clients.iter() {
            let metrics = &metrics;
            let kinds = &cfg.kinds;
            scope.spawn(move || collect(client, kinds, metrics));
        }
    });

    Ok(())
}

/// Resolves every kind for every slot from the current one onwards.
///
/// Each resolution waits for its slot to close, so the loop naturally
/// advances at one slot per slot duration.
fn collect(client: &HttpBeaconClient, kinds: &[MetricKind], metrics: &MetricsRegistry) {
    let mut slot = loop {
        match client.current_slot() {
            Ok(slot) => break slot,
            Err(e) => {
                tracing::warn!(base_url = client.base_url(), "waiting for genesis: {e}");
                std::thread::sleep(client.polling().interval);
            }
        }
    };

    loop {
        for &kind in kinds {
            let start = Instant::now();
            let outcome = client.data_point(kind, slot);
            metrics
                .collector
                .record(client.base_url(), kind, slot, &outcome, start.elapsed());

            match outcome {
                Ok(value) => tracing::info!(
                    base_url = client.base_url(),
                    slot,
                    %kind,
                    value = value.as_u64(),
                    "metric"
                ),
                Err(e) => tracing::warn!(
                    base_url = client.base_url(),
                    slot,
                    %kind,
                    "failed to resolve metric: {e}"
                ),
            }
        }
        slot += 1;
    }
}
