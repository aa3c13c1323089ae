//! Top-level configuration for a metrics collector.
//!
//! This module aggregates configuration for:
//!
//! - the beacon nodes to query (`BeaconConfig`),
//! - the polling policies of the resolver (`PollingConfig`),
//! - the Prometheus exporter (`MetricsConfig`),
//! - and the metric kinds the collector resolves every slot.
//!
//! Everything has a usable default; [`CollectorConfig::from_env`] layers
//! environment variables on top of those defaults.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::BeaconError;
use crate::gateway::http::DEFAULT_REQUEST_TIMEOUT;
use crate::resolver::MetricKind;
use crate::retry::{DEFAULT_ATTESTATION_TIMEOUT, DEFAULT_POLL_INTERVAL, RetryPolicy};

/// Beacon nodes to register and how to talk to them.
#[derive(Clone, Debug)]
pub struct BeaconConfig {
    /// Base URLs of the beacon nodes, e.g. `"http://127.0.0.1:5052"`.
    pub base_urls: Vec<String>,
    /// Timeout of every single request.
    pub request_timeout: Duration,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            base_urls: vec!["http://127.0.0.1:5052".to_string()],
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Polling behaviour of the metric resolver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollingConfig {
    /// Sleep between two polls of either wait loop.
    pub interval: Duration,
    /// Overall ceiling of an attestation scan.
    pub attestation_timeout: Duration,
    /// Optional deadline for the wait until a slot has closed.
    ///
    /// `None` (the default) waits indefinitely; asking for a slot far in the
    /// future then blocks the caller for as long as it takes.
    pub slot_close_deadline: Option<Duration>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            attestation_timeout: DEFAULT_ATTESTATION_TIMEOUT,
            slot_close_deadline: None,
        }
    }
}

impl PollingConfig {
    pub fn slot_close_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.interval, self.slot_close_deadline)
    }

    pub fn attestation_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.interval, Some(self.attestation_timeout))
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 9898)),
        }
    }
}

/// Top-level configuration of the collector binary.
#[derive(Clone, Debug)]
pub struct CollectorConfig {
    pub beacon: BeaconConfig,
    pub polling: PollingConfig,
    pub metrics: MetricsConfig,
    /// Metric kinds resolved for every slot.
    pub kinds: Vec<MetricKind>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            beacon: BeaconConfig::default(),
            polling: PollingConfig::default(),
            metrics: MetricsConfig::default(),
            kinds: MetricKind::ALL.to_vec(),
        }
    }
}

impl CollectorConfig {
    /// Loads the configuration from process environment variables.
    pub fn from_env() -> Result<Self, BeaconError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration from an arbitrary key lookup.
    ///
    /// Recognised keys:
    ///
    /// - `BEACON_URLS`: comma-separated base URLs,
    /// - `BEACON_REQUEST_TIMEOUT_SECS`,
    /// - `BEACON_POLL_INTERVAL_MS`,
    /// - `BEACON_ATTESTATION_TIMEOUT_SECS`,
    /// - `BEACON_SLOT_CLOSE_DEADLINE_SECS`,
    /// - `BEACON_METRICS`: comma-separated metric names,
    /// - `METRICS_ENABLED`: `true` / `false`,
    /// - `METRICS_LISTEN_ADDR`.
    ///
    /// Missing keys keep their defaults; malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BeaconError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(urls) = lookup("BEACON_URLS") {
            cfg.beacon.base_urls = split_list(&urls).map(str::to_string).collect();
            if cfg.beacon.base_urls.is_empty() {
                return Err(BeaconError::Config("BEACON_URLS is empty".to_string()));
            }
        }
        if let Some(secs) = parse_key::<u64>(&lookup, "BEACON_REQUEST_TIMEOUT_SECS")? {
            cfg.beacon.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_key::<u64>(&lookup, "BEACON_POLL_INTERVAL_MS")? {
            if ms == 0 {
                return Err(BeaconError::Config(
                    "BEACON_POLL_INTERVAL_MS must be greater than zero".to_string(),
                ));
            }
            cfg.polling.interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_key::<u64>(&lookup, "BEACON_ATTESTATION_TIMEOUT_SECS")? {
            cfg.polling.attestation_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_key::<u64>(&lookup, "BEACON_SLOT_CLOSE_DEADLINE_SECS")? {
            cfg.polling.slot_close_deadline = Some(Duration::from_secs(secs));
        }
        if let Some(kinds) = lookup("BEACON_METRICS") {
            cfg.kinds = split_list(&kinds)
                .map(MetricKind::from_str)
                .collect::<Result<_, _>>()?;
        }
        if let Some(enabled) = parse_key::<bool>(&lookup, "METRICS_ENABLED")? {
            cfg.metrics.enabled = enabled;
        }
        if let Some(addr) = parse_key::<SocketAddr>(&lookup, "METRICS_LISTEN_ADDR")? {
            cfg.metrics.listen_addr = addr;
        }

        Ok(cfg)
    }
}

fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn parse_key<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, BeaconError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| BeaconError::Config(format!("{key}={raw:?}: {e}")))
        })
        .transpose()
}
