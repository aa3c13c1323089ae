//! Response envelope classification.
//!
//! Success bodies look like `{"code": 200, "data": ...}` (the `code` field
//! is optional) and error bodies like `{"code": 404, "message": "..."}`.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::BeaconError;

#[derive(Debug, Deserialize)]
struct SuccessEnvelope<T> {
    #[serde(default)]
    #[allow(dead_code)]
    code: Option<i64>,
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    #[allow(dead_code)]
    code: Option<i64>,
    message: String,
}

/// Decodes a response body according to its HTTP status.
///
/// Statuses in `[200, 400)` decode the success envelope into `T`. Any
/// other status fails with the envelope's `message`, or with a generic
/// `unknown error, status code: N` when the error body is not decodable.
pub fn decode_envelope<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, BeaconError> {
    if !(200..400).contains(&status) {
        return Err(match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(err) => BeaconError::Remote(err.message),
            Err(_) => BeaconError::Remote(format!("unknown error, status code: {status}")),
        });
    }

    let envelope: SuccessEnvelope<T> = serde_json::from_slice(body)?;
    Ok(envelope.data)
}
