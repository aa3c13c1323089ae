use std::time::Instant;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use beacon_metrics::{MetricKind, MetricValue};

use super::{as_error_response, join_failed, unknown_client};
use crate::state::SharedState;

/// Response body for `GET /clients/{id}/metrics/{kind}/{slot}`.
#[derive(Debug, Serialize)]
pub struct MetricResponse {
    /// Base URL of the beacon node the value was read from.
    pub client: String,
    pub kind: MetricKind,
    pub slot: u64,
    /// Numeric sample; flags are reported as `0` / `1`.
    pub value: u64,
    /// Typed value, tagged with its kind.
    pub metric: MetricValue,
}

/// `GET /clients/{id}/metrics/{kind}/{slot}`
///
/// Resolves one metric for one slot. The request blocks until the slot has
/// closed; for attestation metrics it may then take up to the configured
/// attestation timeout.
pub async fn get_metric(
    State(state): State<SharedState>,
    Path((id, kind, slot)): Path<(usize, String, u64)>,
) -> Result<Json<MetricResponse>, (StatusCode, String)> {
    let kind: MetricKind = kind.parse().map_err(as_error_response)?;
    if state.clients.get(id).is_none() {
        return Err(unknown_client(id));
    }

    let clients = state.clients.clone();
    let metrics = state.metrics.clone();

    tokio::task::spawn_blocking(move || -> Result<Json<MetricResponse>, (StatusCode, String)> {
        let client = clients.get(id).ok_or_else(|| unknown_client(id))?;

        let start = Instant::now();
        let outcome = client.data_point(kind, slot);
        metrics
            .collector
            .record(client.base_url(), kind, slot, &outcome, start.elapsed());

        let metric = outcome.map_err(as_error_response)?;
        Ok(Json(MetricResponse {
            client: client.base_url().to_string(),
            kind,
            slot,
            value: metric.as_u64(),
            metric,
        }))
    })
    .await
    .map_err(join_failed)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{block_on, state_with_clients};

    #[test]
    fn unknown_kind_is_a_bad_request() {
        let state = state_with_clients(1);
        let (status, body) = block_on(get_metric(
            State(state.clone()),
            Path((0, "gas_used".to_string(), 5)),
        ))
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "invalid data name: gas_used");
    }

    #[test]
    fn unknown_client_is_not_found() {
        let state = state_with_clients(0);
        let (status, _) = block_on(get_metric(
            State(state.clone()),
            Path((3, "slot_block".to_string(), 5)),
        ))
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn missing_block_resolves_to_zero_and_is_recorded() {
        let state = state_with_clients(1);
        let Json(resp) = block_on(get_metric(
            State(state.clone()),
            Path((0, "slot_block".to_string(), 1)),
        ))
        .unwrap();

        assert_eq!(resp.kind, MetricKind::BlockPresence);
        assert_eq!(resp.slot, 1);
        assert_eq!(resp.value, 0);
        assert_eq!(resp.metric, MetricValue::BlockPresence(false));
        assert!(state.metrics.gather_text().contains("kind=\"slot_block\""));
    }
}
