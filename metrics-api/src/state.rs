//! Shared application state.

use std::sync::Arc;

use beacon_metrics::{HttpBeaconClients, MetricsRegistry};

/// Shared state held by the API handlers.
///
/// This is wrapped in an [`Arc`] and passed to request handlers via Axum's
/// `State` extractor. The registry itself sits behind its own [`Arc`] so
/// handlers can move it into blocking tasks.
pub struct AppState {
    /// Registered beacon clients, indexed by registration order.
    pub clients: Arc<HttpBeaconClients>,
    /// Metrics registry updated after every resolution served by the API.
    pub metrics: Arc<MetricsRegistry>,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
