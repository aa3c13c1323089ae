//! Beacon client: one gateway, one slot clock, typed endpoint accessors.

use crate::clock::{Clock, SlotClock, SystemClock};
use crate::config::PollingConfig;
use crate::error::BeaconError;
use crate::gateway::{
    CONFIG_SPEC_ENDPOINT, Gateway, HttpGateway, block_attestations_endpoint,
    block_header_endpoint, committees_endpoint, finality_checkpoints_endpoint,
};
use crate::resolver::{MetricKind, MetricResolver, MetricValue};
use crate::types::{Attestation, BlockHeader, ChainSpec, Committee, FinalityCheckpoints};

/// Client of a single beacon node.
///
/// Owns its gateway (and therefore its request serialization) plus its
/// genesis/TTD caches. Nothing is shared between clients, even when two
/// clients point at the same node.
pub struct BeaconClient<G = HttpGateway, C = SystemClock> {
    gateway: G,
    clock: C,
    slots: SlotClock,
    polling: PollingConfig,
}

impl<G: Gateway, C: Clock> BeaconClient<G, C> {
    /// Fetches the chain spec through `gateway` and builds a client.
    pub fn connect(gateway: G, clock: C, polling: PollingConfig) -> Result<Self, BeaconError> {
        let spec: ChainSpec = gateway.get(CONFIG_SPEC_ENDPOINT)?;
        let client = Self::with_spec(gateway, clock, spec, polling)?;
        tracing::info!(
            base_url = client.base_url(),
            seconds_per_slot = spec.seconds_per_slot,
            slots_per_epoch = spec.slots_per_epoch,
            "loaded chain spec"
        );
        Ok(client)
    }

    /// Builds a client from an already known chain spec.
    ///
    /// Fails with [`BeaconError::InvalidSpec`] if either spec value is zero.
    pub fn with_spec(
        gateway: G,
        clock: C,
        spec: ChainSpec,
        polling: PollingConfig,
    ) -> Result<Self, BeaconError> {
        Ok(Self {
            gateway,
            clock,
            slots: SlotClock::new(spec)?,
            polling,
        })
    }

    pub fn base_url(&self) -> &str {
        self.gateway.base_url()
    }

    pub fn spec(&self) -> &ChainSpec {
        self.slots.spec()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn polling(&self) -> &PollingConfig {
        &self.polling
    }

    // ---------------------------
    // Slot clock
    // ---------------------------

    pub fn genesis_time(&self) -> Option<u64> {
        self.slots.genesis_time(&self.gateway)
    }

    pub fn slot_at_time(&self, t: u64) -> Result<u64, BeaconError> {
        self.slots.slot_at_time(&self.gateway, t)
    }

    /// The slot currently in progress.
    pub fn current_slot(&self) -> Result<u64, BeaconError> {
        self.slots.current_slot(&self.gateway, &self.clock)
    }

    /// Slot of the chain head, approximated by the ongoing wall-clock slot.
    pub fn latest_block_slot(&self) -> Result<u64, BeaconError> {
        self.current_slot()
    }

    pub fn update_ttd_timestamp(&self, timestamp: u64) {
        self.slots.update_ttd_timestamp(timestamp);
    }

    pub fn ttd_timestamp(&self) -> Option<u64> {
        self.slots.ttd_timestamp()
    }

    pub fn ttd_slot(&self) -> Result<Option<u64>, BeaconError> {
        self.slots.ttd_slot(&self.gateway)
    }

    // ---------------------------
    // Endpoints
    // ---------------------------

    pub fn block_header(&self, slot: u64) -> Result<BlockHeader, BeaconError> {
        self.gateway.get(&block_header_endpoint(slot))
    }

    pub fn finality_checkpoints(&self, slot: u64) -> Result<FinalityCheckpoints, BeaconError> {
        self.gateway.get(&finality_checkpoints_endpoint(slot))
    }

    /// Committees attesting in `slot`.
    ///
    /// The node answers with every committee of the slot's epoch; only
    /// those assigned to `slot` itself are kept.
    pub fn slot_committees(&self, slot: u64) -> Result<Vec<Committee>, BeaconError> {
        let all: Vec<Committee> = self.gateway.get(&committees_endpoint(slot))?;
        Ok(all.into_iter().filter(|c| c.slot == slot).collect())
    }

    /// Total number of validators across the committees of `slot`.
    pub fn slot_committee_size(&self, slot: u64) -> Result<u64, BeaconError> {
        let committees = self.slot_committees(slot)?;
        Ok(committees.iter().map(|c| c.validators.len() as u64).sum())
    }

    /// Attestations included in the block at `block`.
    pub fn attestations_at_block(&self, block: u64) -> Result<Vec<Attestation>, BeaconError> {
        self.gateway.get(&block_attestations_endpoint(block))
    }

    // ---------------------------
    // Metrics
    // ---------------------------

    /// Resolver over this client using its configured polling policies.
    pub fn resolver(&self) -> MetricResolver<'_, G, C> {
        MetricResolver::new(self)
    }

    /// Resolves `kind` for `slot`, waiting for the slot to close first.
    pub fn data_point(&self, kind: MetricKind, slot: u64) -> Result<MetricValue, BeaconError> {
        self.resolver().resolve(kind, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::testing::FakeGateway;
    use serde_json::json;

    fn spec_json() -> serde_json::Value {
        json!({"SECONDS_PER_SLOT": "12", "SLOTS_PER_EPOCH": "8"})
    }

    #[test]
    fn connect_loads_chain_spec() {
        let gw = FakeGateway::new("http://node");
        gw.serve(CONFIG_SPEC_ENDPOINT, spec_json());
        let client =
            BeaconClient::connect(gw, ManualClock::at_secs(0), PollingConfig::default()).unwrap();
        assert_eq!(client.spec().seconds_per_slot, 12);
        assert_eq!(client.spec().slots_per_epoch, 8);
        assert_eq!(client.base_url(), "http://node");
    }

    #[test]
    fn connect_rejects_zero_seconds_per_slot() {
        let gw = FakeGateway::new("http://node");
        gw.serve(
            CONFIG_SPEC_ENDPOINT,
            json!({"SECONDS_PER_SLOT": "0", "SLOTS_PER_EPOCH": "8"}),
        );
        let res = BeaconClient::connect(gw, ManualClock::at_secs(0), PollingConfig::default());
        assert!(matches!(res, Err(BeaconError::InvalidSpec(_))));
    }

    #[test]
    fn connect_fails_when_spec_is_unavailable() {
        let gw = FakeGateway::new("http://node");
        gw.fail(CONFIG_SPEC_ENDPOINT, "service unavailable");
        let res = BeaconClient::connect(gw, ManualClock::at_secs(0), PollingConfig::default());
        assert!(matches!(res, Err(BeaconError::Remote(msg)) if msg == "service unavailable"));
    }

    #[test]
    fn slot_committees_keep_only_the_requested_slot() {
        let gw = FakeGateway::new("http://node");
        gw.serve(
            committees_endpoint(17),
            json!([
                {"index": "0", "slot": "16", "validators": ["1", "2"]},
                {"index": "0", "slot": "17", "validators": ["3", "4", "5"]},
                {"index": "1", "slot": "17", "validators": ["6"]},
                {"index": "0", "slot": "18", "validators": ["7", "8", "9", "10"]}
            ]),
        );
        let spec = ChainSpec {
            seconds_per_slot: 12,
            slots_per_epoch: 8,
        };
        let client =
            BeaconClient::with_spec(gw, ManualClock::at_secs(0), spec, PollingConfig::default())
                .unwrap();

        let committees = client.slot_committees(17).unwrap();
        assert_eq!(committees.len(), 2);
        assert!(committees.iter().all(|c| c.slot == 17));
        assert_eq!(client.slot_committee_size(17).unwrap(), 4);
    }

    #[test]
    fn latest_block_slot_tracks_wall_clock() {
        let gw = FakeGateway::new("http://node");
        gw.serve(
            crate::gateway::GENESIS_ENDPOINT,
            json!({"genesis_time": "1000"}),
        );
        let spec = ChainSpec {
            seconds_per_slot: 12,
            slots_per_epoch: 8,
        };
        let client = BeaconClient::with_spec(
            gw,
            ManualClock::at_secs(1000 + 12 * 40),
            spec,
            PollingConfig::default(),
        )
        .unwrap();
        assert_eq!(client.latest_block_slot().unwrap(), 40);
        assert_eq!(client.genesis_time(), Some(1000));
    }

    #[test]
    fn with_spec_rejects_zero_values_up_front() {
        for spec in [
            ChainSpec {
                seconds_per_slot: 0,
                slots_per_epoch: 8,
            },
            ChainSpec {
                seconds_per_slot: 12,
                slots_per_epoch: 0,
            },
        ] {
            let gw = FakeGateway::new("http://node");
            gw.serve(
                crate::gateway::GENESIS_ENDPOINT,
                json!({"genesis_time": "1000"}),
            );
            let res = BeaconClient::with_spec(
                gw,
                ManualClock::at_secs(2000),
                spec,
                PollingConfig::default(),
            );
            assert!(matches!(res, Err(BeaconError::InvalidSpec(_))));
        }
    }
}
