//! Beacon metrics library crate.
//!
//! This crate derives per-slot metrics from a proof-of-stake beacon node's
//! REST API for test and monitoring harnesses:
//!
//! - strongly-typed beacon objects (`types`),
//! - a serialized request gateway with envelope decoding (`gateway`),
//! - slot arithmetic over a lazily fetched genesis time (`clock`),
//! - fixed-interval polling policies (`retry`),
//! - the forward attestation scan (`poller`),
//! - per-kind metric derivation (`resolver`),
//! - clients and the client registry (`client`, `registry`),
//! - Prometheus-based metrics of the collector itself (`metrics`),
//! - and a top-level collector configuration (`config`).

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod poller;
pub mod registry;
pub mod resolver;
pub mod retry;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export top-level configuration types.
pub use config::{BeaconConfig, CollectorConfig, MetricsConfig, PollingConfig};

// Re-export the metric engine.
pub use client::BeaconClient;
pub use clock::{Clock, SlotClock, SystemClock};
pub use error::BeaconError;
pub use gateway::{Gateway, HttpGateway};
pub use poller::AttestationPoller;
pub use registry::{BeaconClients, HttpBeaconClients};
pub use resolver::{MetricKind, MetricResolver, MetricValue};
pub use retry::RetryPolicy;

// Re-export metrics registry and collector metrics.
pub use metrics::{CollectorMetrics, MetricsRegistry, run_prometheus_http_server};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for a client talking HTTP on the system clock.
pub type HttpBeaconClient = BeaconClient<HttpGateway, SystemClock>;
