//! Attestation count lookup.
//!
//! Attestations voting for slot `N` only become observable once a later
//! block includes them, so a count for `N` cannot be read directly: the
//! poller scans forward from block `N + 1` as the chain head advances,
//! until it meets an attestation whose `data.slot` is `N` or the overall
//! ceiling expires.

use crate::client::BeaconClient;
use crate::clock::Clock;
use crate::error::BeaconError;
use crate::gateway::Gateway;
use crate::retry::{Elapsed, RetryPolicy};

/// Forward scan for the attestations of one slot.
pub struct AttestationPoller<'a, G, C> {
    client: &'a BeaconClient<G, C>,
    policy: RetryPolicy,
}

impl<'a, G: Gateway, C: Clock> AttestationPoller<'a, G, C> {
    pub fn new(client: &'a BeaconClient<G, C>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Number of participants in the first aggregate found for `target_slot`.
    ///
    /// Every pass reads the head slot and fetches the attestations of each
    /// block between the last verified block and the head. A failed fetch
    /// ends the pass without advancing, so the same block is retried on the
    /// next pass rather than skipped. Between passes the poller sleeps one
    /// policy interval.
    pub fn count_attestations(&self, target_slot: u64) -> Result<u64, BeaconError> {
        let mut last_verified_block = target_slot;

        self.policy
            .poll(self.client.clock(), || {
                self.scan(target_slot, &mut last_verified_block)
            })
            .map_err(|Elapsed(elapsed)| {
                tracing::warn!(
                    base_url = self.client.base_url(),
                    slot = target_slot,
                    last_verified_block,
                    "timed out waiting for attestations"
                );
                BeaconError::AttestationTimeout {
                    slot: target_slot,
                    elapsed,
                }
            })
    }

    fn scan(&self, target_slot: u64, last_verified_block: &mut u64) -> Option<u64> {
        // An unknown head reads as "no progress yet".
        let head = self.client.latest_block_slot().unwrap_or(0);

        while head > *last_verified_block {
            let block = *last_verified_block + 1;
            let attestations = match self.client.attestations_at_block(block) {
                Ok(attestations) => attestations,
                Err(e) => {
                    tracing::debug!(
                        base_url = self.client.base_url(),
                        block,
                        "attestation fetch failed, retrying next pass: {e}"
                    );
                    return None;
                }
            };

            if let Some(att) = attestations.iter().find(|a| a.data.slot == target_slot) {
                let count = att.participant_count();
                tracing::debug!(slot = target_slot, block, count, "found slot attestations");
                return Some(count);
            }
            *last_verified_block = block;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{Value, json};

    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::config::PollingConfig;
    use crate::gateway::{GENESIS_ENDPOINT, block_attestations_endpoint};
    use crate::testing::FakeGateway;
    use crate::types::ChainSpec;

    const GENESIS: u64 = 1_000;
    const SECONDS_PER_SLOT: u64 = 12;

    fn slot_start(slot: u64) -> u64 {
        GENESIS + slot * SECONDS_PER_SLOT
    }

    fn client_at(now: u64) -> BeaconClient<FakeGateway, ManualClock> {
        let gw = FakeGateway::new("http://node");
        gw.serve(GENESIS_ENDPOINT, json!({"genesis_time": GENESIS.to_string()}));
        let spec = ChainSpec {
            seconds_per_slot: SECONDS_PER_SLOT,
            slots_per_epoch: 8,
        };
        BeaconClient::with_spec(gw, ManualClock::at_secs(now), spec, PollingConfig::default())
            .unwrap()
    }

    fn attestation(slot: u64, bits: &str) -> Value {
        let zero = format!("0x{}", "00".repeat(32));
        json!({
            "aggregation_bits": bits,
            "data": {
                "slot": slot.to_string(),
                "index": "0",
                "beacon_block_root": zero,
                "source": {"epoch": "0", "root": zero},
                "target": {"epoch": "0", "root": zero}
            },
            "signature": "0x00"
        })
    }

    fn poller(client: &BeaconClient<FakeGateway, ManualClock>) -> AttestationPoller<'_, FakeGateway, ManualClock> {
        AttestationPoller::new(client, client.polling().attestation_policy())
    }

    #[test]
    fn finds_attestation_included_two_blocks_later() {
        let target = 10;
        // Slot `target + 1` is in progress: only block `target + 1` is scannable.
        let client = client_at(slot_start(target + 1));
        let gw = client.gateway();
        gw.serve(block_attestations_endpoint(target + 1), json!([attestation(target - 1, "0xff")]));
        gw.serve(
            block_attestations_endpoint(target + 2),
            json!([attestation(target - 1, "0x03"), attestation(target, "0x1f")]),
        );

        assert_eq!(poller(&client).count_attestations(target).unwrap(), 4);
        assert_eq!(gw.hits(&block_attestations_endpoint(target + 1)), 1);
        assert_eq!(gw.hits(&block_attestations_endpoint(target + 2)), 1);
    }

    #[test]
    fn empty_bitlist_counts_zero() {
        let target = 3;
        let client = client_at(slot_start(target + 2));
        client
            .gateway()
            .serve(block_attestations_endpoint(target + 1), json!([attestation(target, "0x00")]));

        assert_eq!(poller(&client).count_attestations(target).unwrap(), 0);
    }

    #[test]
    fn fetch_failure_does_not_skip_the_block() {
        let target = 5;
        let client = client_at(slot_start(target + 3));
        let gw = client.gateway();
        gw.fail(block_attestations_endpoint(target + 1), "internal error");
        gw.serve(block_attestations_endpoint(target + 2), json!([attestation(target, "0x07")]));

        let res = poller(&client).count_attestations(target);

        // Block `target + 1` keeps failing, so block `target + 2` is never read.
        assert!(matches!(res, Err(BeaconError::AttestationTimeout { slot: 5, .. })));
        assert_eq!(gw.hits(&block_attestations_endpoint(target + 2)), 0);
        assert!(gw.hits(&block_attestations_endpoint(target + 1)) > 1);
    }

    #[test]
    fn times_out_when_no_attestation_ever_appears() {
        let target = 20;
        let client = client_at(slot_start(target + 1));
        for block in target + 1..target + 20 {
            client
                .gateway()
                .serve(block_attestations_endpoint(block), json!([]));
        }
        let start = client.clock().now();

        let err = poller(&client).count_attestations(target).unwrap_err();

        match err {
            BeaconError::AttestationTimeout { slot, elapsed } => {
                assert_eq!(slot, target);
                assert_eq!(elapsed, Duration::from_secs(61));
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
        assert_eq!(client.clock().now() - start, Duration::from_secs(61));
    }

    #[test]
    fn waits_for_head_to_pass_target() {
        let target = 7;
        // Slot `target` itself is still in progress: nothing to scan yet.
        let client = client_at(slot_start(target) + 5);
        client
            .gateway()
            .serve(block_attestations_endpoint(target + 1), json!([attestation(target, "0x0f")]));

        assert_eq!(poller(&client).count_attestations(target).unwrap(), 3);
        // Head reached `target + 1` once simulated time crossed its start.
        assert!(client.clock().now() >= Duration::from_secs(slot_start(target + 1)));
    }
}
