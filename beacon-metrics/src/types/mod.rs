//! Core domain types read from the beacon node.
//!
//! This module defines strongly-typed roots, the static chain spec, and
//! the slot-indexed consensus objects the metric derivations consume.
//! Numeric fields arrive as decimal strings on the wire and hashes as
//! `0x`-prefixed hex; both are decoded here so the rest of the crate only
//! sees native integers and fixed-size byte arrays.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_with::{DisplayFromStr, serde_as};

/// Types describing attestations and their aggregation bitlists.
pub mod attestation;

pub use attestation::{AggregationBits, Attestation, AttestationData};

/// Length in bytes of all 256-bit roots used in this module.
pub const ROOT_LEN: usize = 32;

/// Strongly-typed 256-bit root (block, state or checkpoint root).
///
/// On the wire this is a `0x`-prefixed, 64-character hex string.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct Root(pub [u8; ROOT_LEN]);

impl Root {
    /// The all-zero root, used by beacon nodes for "not set yet".
    pub const ZERO: Root = Root([0u8; ROOT_LEN]);

    /// Returns `true` for the all-zero root.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Returns the underlying 32-byte array.
    pub fn as_bytes(&self) -> &[u8; ROOT_LEN] {
        &self.0
    }

    /// Parses a `0x`-prefixed (or bare) hex string into a root.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes = decode_hex(s)?;
        let arr: [u8; ROOT_LEN] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("expected {ROOT_LEN}-byte root, got {} bytes", b.len()))?;
        Ok(Root(arr))
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Root({self})")
    }
}

impl Serialize for Root {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Root {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Root::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Decodes a hex string with an optional `0x` prefix.
pub(crate) fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| format!("invalid hex {s:?}: {e}"))
}

/// Static chain configuration fetched once per client at registration.
///
/// Only the two constants the slot arithmetic needs are kept; every other
/// key of the config endpoint is ignored.
#[serde_as]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChainSpec {
    #[serde(rename = "SECONDS_PER_SLOT")]
    #[serde_as(as = "DisplayFromStr")]
    pub seconds_per_slot: u64,
    #[serde(rename = "SLOTS_PER_EPOCH")]
    #[serde_as(as = "DisplayFromStr")]
    pub slots_per_epoch: u64,
}

impl ChainSpec {
    /// Checks that both constants are non-zero.
    ///
    /// A zero `seconds_per_slot` would make slot arithmetic divide by zero
    /// and a zero `slots_per_epoch` would make every slot an epoch boundary.
    pub fn validate(&self) -> Result<(), String> {
        if self.seconds_per_slot == 0 {
            return Err("SECONDS_PER_SLOT must be greater than zero".to_string());
        }
        if self.slots_per_epoch == 0 {
            return Err("SLOTS_PER_EPOCH must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Returns `true` if `slot` is the first slot of an epoch.
    ///
    /// Always `false` for a spec with a zero epoch length.
    pub fn is_epoch_boundary(&self, slot: u64) -> bool {
        slot.checked_rem(self.slots_per_epoch) == Some(0)
    }
}

/// Genesis information.
#[serde_as]
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Genesis {
    #[serde_as(as = "DisplayFromStr")]
    pub genesis_time: u64,
}

/// Beacon block header message.
#[serde_as]
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BeaconBlockHeader {
    #[serde_as(as = "DisplayFromStr")]
    pub slot: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub proposer_index: u64,
    pub parent_root: Root,
    pub state_root: Root,
    pub body_root: Root,
}

/// Signed wrapper around a [`BeaconBlockHeader`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SignedBeaconBlockHeader {
    pub message: BeaconBlockHeader,
    pub signature: String,
}

/// Response payload of the block header by slot endpoint.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub root: Root,
    pub canonical: bool,
    pub header: SignedBeaconBlockHeader,
}

/// An (epoch, root) consensus checkpoint.
#[serde_as]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde_as(as = "DisplayFromStr")]
    pub epoch: u64,
    pub root: Root,
}

/// Finality checkpoints of the state at a slot.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FinalityCheckpoints {
    #[serde(default)]
    pub previous_justified: Option<Checkpoint>,
    pub current_justified: Checkpoint,
    pub finalized: Checkpoint,
}

impl FinalityCheckpoints {
    /// The justified checkpoint used for justification transitions.
    pub fn justified(&self) -> &Checkpoint {
        &self.current_justified
    }

    /// The finalized checkpoint.
    pub fn finalized(&self) -> &Checkpoint {
        &self.finalized
    }
}

/// A beacon committee: the validators assigned to attest in one slot.
#[serde_as]
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Committee {
    #[serde_as(as = "DisplayFromStr")]
    pub index: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub slot: u64,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub validators: Vec<u64>,
}
