use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use super::{as_error_response, join_failed, unknown_client};
use crate::state::SharedState;

/// One entry of `GET /clients`.
#[derive(Debug, Serialize)]
pub struct ClientInfo {
    pub id: usize,
    pub base_url: String,
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,
}

/// `GET /clients`
///
/// Lists the registered beacon nodes in registration order.
pub async fn list_clients(State(state): State<SharedState>) -> Json<Vec<ClientInfo>> {
    let infos = state
        .clients
        .iter()
        .enumerate()
        .map(|(id, client)| ClientInfo {
            id,
            base_url: client.base_url().to_string(),
            seconds_per_slot: client.spec().seconds_per_slot,
            slots_per_epoch: client.spec().slots_per_epoch,
        })
        .collect();
    Json(infos)
}

/// Response body for `GET /clients/{id}/ttd`.
#[derive(Debug, Serialize)]
pub struct TtdResponse {
    pub ttd_timestamp: Option<u64>,
    pub ttd_slot: Option<u64>,
}

/// `GET /clients/{id}/ttd`
///
/// Returns the TTD timestamp and its slot; both are `null` until a
/// timestamp has been set.
pub async fn get_ttd(
    State(state): State<SharedState>,
    Path(id): Path<usize>,
) -> Result<Json<TtdResponse>, (StatusCode, String)> {
    if state.clients.get(id).is_none() {
        return Err(unknown_client(id));
    }
    let clients = state.clients.clone();

    // Resolving the slot may fetch genesis time over the network.
    tokio::task::spawn_blocking(move || -> Result<Json<TtdResponse>, (StatusCode, String)> {
        let client = clients.get(id).ok_or_else(|| unknown_client(id))?;
        let ttd_slot = client.ttd_slot().map_err(as_error_response)?;
        Ok(Json(TtdResponse {
            ttd_timestamp: client.ttd_timestamp(),
            ttd_slot,
        }))
    })
    .await
    .map_err(join_failed)?
}

/// Request body for `PUT /clients/{id}/ttd`.
#[derive(Debug, Deserialize)]
pub struct SetTtdRequest {
    /// UNIX timestamp of the terminal total difficulty block.
    pub timestamp: u64,
}

/// `PUT /clients/{id}/ttd`
///
/// Records the TTD block timestamp observed on the execution layer.
pub async fn set_ttd(
    State(state): State<SharedState>,
    Path(id): Path<usize>,
    Json(body): Json<SetTtdRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let client = state.clients.get(id).ok_or_else(|| unknown_client(id))?;
    client.update_ttd_timestamp(body.timestamp);
    tracing::info!(base_url = client.base_url(), timestamp = body.timestamp, "updated TTD timestamp");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GENESIS_TIME, SECONDS_PER_SLOT, block_on, state_with_clients};

    #[test]
    fn lists_clients_in_registration_order() {
        let state = state_with_clients(2);
        let Json(infos) = block_on(list_clients(State(state.clone())));
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[1].id, 1);
        assert_eq!(infos[1].base_url, state.clients.base_urls()[1]);
        assert_eq!(infos[0].seconds_per_slot, SECONDS_PER_SLOT);
    }

    #[test]
    fn ttd_round_trips_through_put_and_get() {
        let state = state_with_clients(1);

        let Json(before) = block_on(get_ttd(State(state.clone()), Path(0))).unwrap();
        assert_eq!(before.ttd_timestamp, None);
        assert_eq!(before.ttd_slot, None);

        let timestamp = GENESIS_TIME + SECONDS_PER_SLOT * 100;
        let status = block_on(set_ttd(
            State(state.clone()),
            Path(0),
            Json(SetTtdRequest { timestamp }),
        ))
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(after) = block_on(get_ttd(State(state.clone()), Path(0))).unwrap();
        assert_eq!(after.ttd_timestamp, Some(timestamp));
        assert_eq!(after.ttd_slot, Some(100));
    }

    #[test]
    fn ttd_of_unknown_client_is_not_found() {
        let state = state_with_clients(0);
        let (status, _) = block_on(get_ttd(State(state.clone()), Path(0))).unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = block_on(set_ttd(
            State(state.clone()),
            Path(0),
            Json(SetTtdRequest { timestamp: 1 }),
        ))
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
