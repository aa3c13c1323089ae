//! Request gateway to a beacon node.
//!
//! The [`Gateway`] trait is the seam between the metric engine and the
//! transport. [`http::HttpGateway`] talks to a real node over HTTP; tests
//! substitute an in-memory implementation that serves canned payloads.

pub mod envelope;
pub mod http;

use serde::de::DeserializeOwned;

use crate::error::BeaconError;

pub use envelope::decode_envelope;
pub use http::HttpGateway;

pub const GENESIS_ENDPOINT: &str = "/eth/v1/beacon/genesis";
pub const CONFIG_SPEC_ENDPOINT: &str = "/eth/v1/config/spec";

pub fn block_header_endpoint(slot: u64) -> String {
    format!("/eth/v1/beacon/headers/{slot}")
}

pub fn finality_checkpoints_endpoint(slot: u64) -> String {
    format!("/eth/v1/beacon/states/{slot}/finality_checkpoints")
}

pub fn committees_endpoint(slot: u64) -> String {
    format!("/eth/v1/beacon/states/{slot}/committees")
}

pub fn block_attestations_endpoint(block: u64) -> String {
    format!("/eth/v1/beacon/blocks/{block}/attestations")
}

/// Executes GET requests against a single beacon node.
///
/// Implementations must serialize requests so that at most one is in
/// flight per gateway, and must decode the `{code, data}` envelope so that
/// callers receive only the `data` payload.
pub trait Gateway: Send + Sync {
    /// Base address every path is appended to, without a trailing slash.
    fn base_url(&self) -> &str;

    /// Fetches `path` and decodes the `data` field of the envelope as `T`.
    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BeaconError>;
}
