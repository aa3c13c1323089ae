//! Metrics and instrumentation for the collector.
//!
//! This module republishes resolved beacon metrics as Prometheus gauges
//! and exposes a small HTTP exporter that serves `/metrics` in Prometheus
//! text format.
//!
//! Typical usage:
//!
//! ```ignore
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use beacon_metrics::metrics::{MetricsRegistry, run_prometheus_http_server};
//!
//! let registry = Arc::new(MetricsRegistry::new()?);
//! let addr: SocketAddr = "127.0.0.1:9898".parse()?;
//!
//! // Spawn the HTTP exporter in the background:
//! runtime.spawn(run_prometheus_http_server(registry.clone(), addr));
//!
//! // Elsewhere, after each resolution:
//! registry.collector.record(client.base_url(), kind, slot, &outcome, took);
//! ```

pub mod prometheus;

pub use prometheus::{CollectorMetrics, MetricsRegistry, run_prometheus_http_server};
