use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::SharedState;

/// Health-check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Number of beacon nodes the API can resolve metrics from.
    pub clients: usize,
}

/// `GET /health`
///
/// Liveness plus the number of registered beacon clients. The nodes
/// themselves are not contacted.
pub async fn health(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            clients: state.clients.len(),
        }),
    )
}
