//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and the collector's own metrics, and an async HTTP exporter
//! that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header::HeaderValue,
    server::conn::http1, service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

use crate::error::BeaconError;
use crate::resolver::{MetricKind, MetricValue};

/// Metrics describing the beacon nodes as seen by the collector.
///
/// Resolved values are exported per `(client, kind)`; resolution counts,
/// failures and latency per `kind`.
#[derive(Clone)]
pub struct CollectorMetrics {
    /// Last resolved value of each metric kind.
    pub value: IntGaugeVec,
    /// Slot the last resolved value belongs to.
    pub slot: IntGaugeVec,
    /// Number of successful resolutions.
    pub resolutions_total: IntCounterVec,
    /// Number of failed resolutions.
    pub errors_total: IntCounterVec,
    /// Wall time of a resolution (including the slot-close wait), in seconds.
    pub resolution_seconds: HistogramVec,
}

impl CollectorMetrics {
    /// Registers collector metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let value = IntGaugeVec::new(
            Opts::new("beacon_metric_value", "Last resolved value of a beacon metric"),
            &["client", "kind"],
        )?;
        registry.register(Box::new(value.clone()))?;

        let slot = IntGaugeVec::new(
            Opts::new(
                "beacon_metric_slot",
                "Slot of the last resolved value of a beacon metric",
            ),
            &["client", "kind"],
        )?;
        registry.register(Box::new(slot.clone()))?;

        let resolutions_total = IntCounterVec::new(
            Opts::new(
                "beacon_metric_resolutions_total",
                "Total number of successful metric resolutions",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(resolutions_total.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new(
                "beacon_metric_errors_total",
                "Total number of failed metric resolutions",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        // Attestation lookups can take up to a minute.
        let resolution_seconds = HistogramVec::new(
            HistogramOpts::new(
                "beacon_metric_resolution_seconds",
                "Time to resolve a metric in seconds",
            )
            .buckets(vec![
                0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 12.0, 24.0, 48.0, 64.0,
            ]),
            &["kind"],
        )?;
        registry.register(Box::new(resolution_seconds.clone()))?;

        Ok(Self {
            value,
            slot,
            resolutions_total,
            errors_total,
            resolution_seconds,
        })
    }

    /// Records the outcome of one resolution.
    pub fn record(
        &self,
        client: &str,
        kind: MetricKind,
        slot: u64,
        outcome: &Result<MetricValue, BeaconError>,
        took: Duration,
    ) {
        let kind_label = kind.as_str();
        self.resolution_seconds
            .with_label_values(&[kind_label])
            .observe(took.as_secs_f64());

        match outcome {
            Ok(value) => {
                self.resolutions_total.with_label_values(&[kind_label]).inc();
                self.value
                    .with_label_values(&[client, kind_label])
                    .set(i64::try_from(value.as_u64()).unwrap_or(i64::MAX));
                self.slot
                    .with_label_values(&[client, kind_label])
                    .set(i64::try_from(slot).unwrap_or(i64::MAX));
            }
            Err(_) => self.errors_total.with_label_values(&[kind_label]).inc(),
        }
    }
}

/// Wrapper around a Prometheus registry and the collector metrics.
///
/// This is the main handle you pass around. It can be wrapped in an
/// [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub collector: CollectorMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the collector metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("collector".to_string()), None)?;
        let collector = CollectorMetrics::register(&registry)?;
        Ok(Self {
            registry,
            collector,
        })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
///
/// This function is `async` and is intended to be spawned onto a Tokio
/// runtime, e.g.:
///
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new()?);
/// let addr: SocketAddr = "127.0.0.1:9898".parse()?;
/// runtime.spawn(run_prometheus_http_server(registry.clone(), addr));
/// ```
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(route(req.method(), req.uri().path(), &metrics))
}

fn route(method: &Method, path: &str, metrics: &MetricsRegistry) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/metrics") => {
            let mut resp = Response::new(Full::new(Bytes::from(metrics.gather_text())));
            resp.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            resp
        }
        _ => {
            let mut resp = Response::new(Full::new(Bytes::from("not found")));
            *resp.status_mut() = StatusCode::NOT_FOUND;
            resp
        }
    }
}
