//! Error type shared by the gateway, slot clock, poller and resolver.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by a beacon client.
///
/// Every failure is returned to the immediate caller. The only failures
/// that never reach a caller are the per-block fetch errors absorbed by the
/// attestation scan, which is driven by its own poll/timeout loop instead.
#[derive(Debug, Error)]
pub enum BeaconError {
    /// Connection or request construction failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success response from the beacon node.
    ///
    /// Carries the decoded `message` of the error envelope, or a generic
    /// `unknown error, status code: N` when the body could not be decoded.
    #[error("{0}")]
    Remote(String),

    /// Envelope or payload could not be parsed.
    #[error("decode error: {0}")]
    Decode(String),

    /// Chain spec loaded from the node is unusable.
    #[error("invalid chain spec: {0}")]
    InvalidSpec(String),

    /// Genesis time has not been fetched successfully yet.
    #[error("no genesis yet")]
    GenesisUnavailable,

    /// Queried time precedes genesis.
    #[error("time {time} before genesis {genesis}")]
    PreGenesis { time: u64, genesis: u64 },

    /// No attestation for `slot` was located before the poll ceiling.
    #[error("timeout waiting for attestation count of slot {slot} after {elapsed:?}")]
    AttestationTimeout { slot: u64, elapsed: Duration },

    /// A caller-supplied deadline expired while waiting for `slot` to close.
    #[error("slot {slot} did not close within {elapsed:?}")]
    SlotCloseTimeout { slot: u64, elapsed: Duration },

    /// Committee size computed as zero for `slot`.
    #[error("empty committee for slot {slot}")]
    EmptyCommittee { slot: u64 },

    /// Unrecognised metric name.
    #[error("invalid data name: {0}")]
    UnknownMetric(String),

    /// Invalid client or collector configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BeaconError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BeaconError::Decode(e.to_string())
        } else {
            BeaconError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BeaconError {
    fn from(e: serde_json::Error) -> Self {
        BeaconError::Decode(e.to_string())
    }
}
