pub mod clients;
pub mod health;
pub mod metrics;

use axum::http::StatusCode;
use beacon_metrics::BeaconError;

/// Maps a library error onto the HTTP status reported to API callers.
pub fn status_for(err: &BeaconError) -> StatusCode {
    match err {
        BeaconError::UnknownMetric(_) | BeaconError::PreGenesis { .. } => StatusCode::BAD_REQUEST,
        BeaconError::EmptyCommittee { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        BeaconError::AttestationTimeout { .. } | BeaconError::SlotCloseTimeout { .. } => {
            StatusCode::GATEWAY_TIMEOUT
        }
        BeaconError::GenesisUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        BeaconError::Transport(_)
        | BeaconError::Remote(_)
        | BeaconError::Decode(_)
        | BeaconError::InvalidSpec(_) => StatusCode::BAD_GATEWAY,
        BeaconError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn as_error_response(err: BeaconError) -> (StatusCode, String) {
    (status_for(&err), err.to_string())
}

pub fn unknown_client(id: usize) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("no beacon client with id {id}"))
}

pub fn join_failed(err: tokio::task::JoinError) -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("resolution task failed: {err}"),
    )
}
