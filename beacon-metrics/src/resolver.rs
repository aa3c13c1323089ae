//! Per-slot metric derivation.
//!
//! A resolution always goes through the same steps:
//!
//! 1. wait until the requested slot has closed (the wall-clock slot is
//!    strictly greater), since an in-progress slot is never sampled;
//! 2. dispatch on the [`MetricKind`];
//! 3. for the attestation kinds, poll for the block that carries the
//!    slot's attestations.
//!
//! Each kind completes or fails in one pass; only the attestation scan
//! polls.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::client::BeaconClient;
use crate::clock::Clock;
use crate::error::BeaconError;
use crate::gateway::Gateway;
use crate::poller::AttestationPoller;
use crate::retry::Elapsed;
use crate::types::{Checkpoint, FinalityCheckpoints};

/// The metrics a client can derive for a slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Whether a block was proposed at the slot.
    #[serde(rename = "slot_block")]
    BlockPresence,
    /// Whether the finalized checkpoint moved at this epoch boundary.
    #[serde(rename = "finalized_epoch")]
    FinalizedEpochTransition,
    /// Whether the justified checkpoint moved at this epoch boundary.
    #[serde(rename = "justified_epoch")]
    JustifiedEpochTransition,
    /// Participants of the slot's aggregate attestation.
    #[serde(rename = "slot_attestations")]
    SlotAttestationCount,
    /// Participants as a percentage of the slot's committee size.
    #[serde(rename = "slot_attestations_percentage")]
    SlotAttestationPercentage,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::BlockPresence,
        MetricKind::FinalizedEpochTransition,
        MetricKind::JustifiedEpochTransition,
        MetricKind::SlotAttestationCount,
        MetricKind::SlotAttestationPercentage,
    ];

    /// Stable metric name used in configuration, labels and the HTTP API.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::BlockPresence => "slot_block",
            MetricKind::FinalizedEpochTransition => "finalized_epoch",
            MetricKind::JustifiedEpochTransition => "justified_epoch",
            MetricKind::SlotAttestationCount => "slot_attestations",
            MetricKind::SlotAttestationPercentage => "slot_attestations_percentage",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| BeaconError::UnknownMetric(s.to_string()))
    }
}

/// A resolved metric, one variant per [`MetricKind`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum MetricValue {
    #[serde(rename = "slot_block")]
    BlockPresence(bool),
    #[serde(rename = "finalized_epoch")]
    FinalizedEpochTransition(bool),
    #[serde(rename = "justified_epoch")]
    JustifiedEpochTransition(bool),
    #[serde(rename = "slot_attestations")]
    SlotAttestationCount(u64),
    #[serde(rename = "slot_attestations_percentage")]
    SlotAttestationPercentage(u64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::BlockPresence(_) => MetricKind::BlockPresence,
            MetricValue::FinalizedEpochTransition(_) => MetricKind::FinalizedEpochTransition,
            MetricValue::JustifiedEpochTransition(_) => MetricKind::JustifiedEpochTransition,
            MetricValue::SlotAttestationCount(_) => MetricKind::SlotAttestationCount,
            MetricValue::SlotAttestationPercentage(_) => MetricKind::SlotAttestationPercentage,
        }
    }

    /// Numeric sample of this value: flags map to `0` / `1`.
    pub fn as_u64(&self) -> u64 {
        match *self {
            MetricValue::BlockPresence(flag)
            | MetricValue::FinalizedEpochTransition(flag)
            | MetricValue::JustifiedEpochTransition(flag) => u64::from(flag),
            MetricValue::SlotAttestationCount(n) | MetricValue::SlotAttestationPercentage(n) => n,
        }
    }
}

/// Dispatches metric resolution for one client.
pub struct MetricResolver<'a, G, C> {
    client: &'a BeaconClient<G, C>,
}

impl<'a, G: Gateway, C: Clock> MetricResolver<'a, G, C> {
    pub fn new(client: &'a BeaconClient<G, C>) -> Self {
        Self { client }
    }

    /// Resolves `kind` for `slot`, blocking until `slot` has closed.
    pub fn resolve(&self, kind: MetricKind, slot: u64) -> Result<MetricValue, BeaconError> {
        self.wait_slot_closed(slot)?;

        let value = match kind {
            MetricKind::BlockPresence => MetricValue::BlockPresence(self.block_presence(slot)),
            MetricKind::FinalizedEpochTransition => MetricValue::FinalizedEpochTransition(
                self.checkpoint_transition(slot, FinalityCheckpoints::finalized)?,
            ),
            MetricKind::JustifiedEpochTransition => MetricValue::JustifiedEpochTransition(
                self.checkpoint_transition(slot, FinalityCheckpoints::justified)?,
            ),
            MetricKind::SlotAttestationCount => {
                MetricValue::SlotAttestationCount(self.attestation_count(slot)?)
            }
            MetricKind::SlotAttestationPercentage => {
                MetricValue::SlotAttestationPercentage(self.attestation_percentage(slot)?)
            }
        };

        tracing::debug!(
            base_url = self.client.base_url(),
            %kind,
            slot,
            value = value.as_u64(),
            "resolved metric"
        );
        Ok(value)
    }

    /// Resolves a metric given by name.
    pub fn resolve_named(&self, name: &str, slot: u64) -> Result<MetricValue, BeaconError> {
        let kind = name.parse::<MetricKind>()?;
        self.resolve(kind, slot)
    }

    /// Blocks until the wall-clock slot is strictly past `slot`.
    ///
    /// Errors reading the current slot (e.g. genesis still unknown) count as
    /// "not closed yet". Without a configured deadline this never gives up.
    fn wait_slot_closed(&self, slot: u64) -> Result<(), BeaconError> {
        let policy = self.client.polling().slot_close_policy();
        policy
            .poll(self.client.clock(), || match self.client.current_slot() {
                Ok(current) if current > slot => Some(()),
                _ => None,
            })
            .map_err(|Elapsed(elapsed)| BeaconError::SlotCloseTimeout { slot, elapsed })
    }

    /// A block exists iff its header can be fetched.
    fn block_presence(&self, slot: u64) -> bool {
        match self.client.block_header(slot) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(base_url = self.client.base_url(), slot, "no block header: {e}");
                false
            }
        }
    }

    /// Whether the selected checkpoint root changed going into `slot`.
    ///
    /// Only epoch boundaries (other than slot 0) can carry a transition;
    /// other slots return `false` without touching the node. A zero root at
    /// `slot` means the chain is not finalizing/justifying yet.
    fn checkpoint_transition(
        &self,
        slot: u64,
        select: fn(&FinalityCheckpoints) -> &Checkpoint,
    ) -> Result<bool, BeaconError> {
        if slot == 0 || !self.client.spec().is_epoch_boundary(slot) {
            return Ok(false);
        }

        let current = self.client.finality_checkpoints(slot)?;
        let current_root = select(&current).root;
        if current_root.is_zero() {
            return Ok(false);
        }

        let previous = self.client.finality_checkpoints(slot - 1)?;
        Ok(select(&previous).root != current_root)
    }

    fn attestation_count(&self, slot: u64) -> Result<u64, BeaconError> {
        let policy = self.client.polling().attestation_policy();
        AttestationPoller::new(self.client, policy).count_attestations(slot)
    }

    /// `attestation_count * 100 / committee_size`, integer division.
    fn attestation_percentage(&self, slot: u64) -> Result<u64, BeaconError> {
        let committee_size = self.client.slot_committee_size(slot)?;
        if committee_size == 0 {
            return Err(BeaconError::EmptyCommittee { slot });
        }
        let count = self.attestation_count(slot)?;
        Ok(percentage(count, committee_size))
    }
}

fn percentage(count: u64, committee_size: u64) -> u64 {
    count.saturating_mul(100) / committee_size
}
