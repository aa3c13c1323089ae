//! Attestation types.
//!
//! An attestation lives in a block but votes for an earlier slot
//! (`data.slot`). Its aggregation bitlist has one bit per committee member
//! that took part in the aggregate.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_with::{DisplayFromStr, serde_as};

use super::{Checkpoint, Root, decode_hex};

/// Raw SSZ bitlist bytes of an aggregate, `0x`-prefixed hex on the wire.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AggregationBits(pub Vec<u8>);

impl AggregationBits {
    /// Population count over every byte of the bitlist.
    pub fn count_ones(&self) -> u64 {
        self.0.iter().map(|b| u64::from(b.count_ones())).sum()
    }
}

impl Serialize for AggregationBits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for AggregationBits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode_hex(&s).map(AggregationBits).map_err(de::Error::custom)
    }
}

/// The vote carried by an attestation.
#[serde_as]
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AttestationData {
    #[serde_as(as = "DisplayFromStr")]
    pub slot: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub index: u64,
    pub beacon_block_root: Root,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

/// An aggregate attestation included in a block.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Attestation {
    pub aggregation_bits: AggregationBits,
    pub data: AttestationData,
    #[serde(default)]
    pub signature: Option<String>,
}

impl Attestation {
    /// Number of participants credited for this aggregate.
    ///
    /// This is the bitlist population count minus one, floored at zero.
    // NOTE: the "minus one" correction is inherited behaviour; verify
    // against the consensus spec before relying on its meaning.
    pub fn participant_count(&self) -> u64 {
        self.aggregation_bits.count_ones().saturating_sub(1)
    }
}
