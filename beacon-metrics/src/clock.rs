//! Wall-clock source and slot arithmetic.
//!
//! [`Clock`] abstracts "what time is it" and "wait a bit" so that every
//! polling loop in the crate can be driven by simulated time in tests.
//! [`SlotClock`] turns UNIX timestamps into slot numbers using the chain
//! spec and a lazily fetched genesis time.

use std::sync::{OnceLock, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::BeaconError;
use crate::gateway::{GENESIS_ENDPOINT, Gateway};
use crate::types::{ChainSpec, Genesis};

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Time elapsed since the UNIX epoch.
    fn now(&self) -> Duration;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// The real system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        // A system clock set before 1970 reads as the epoch itself.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| Duration::from_secs(0))
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Slot arithmetic for one client.
///
/// Genesis time is fetched on first use and then cached for the lifetime
/// of the client; the first successful fetch wins. The TTD timestamp is set
/// from outside (e.g. by whoever watches the execution layer) and the slot
/// derived from it is likewise cached once resolved.
#[derive(Debug)]
pub struct SlotClock {
    spec: ChainSpec,
    genesis_time: OnceLock<u64>,
    ttd_timestamp: RwLock<Option<u64>>,
    ttd_slot: OnceLock<u64>,
}

impl SlotClock {
    /// Builds a slot clock, rejecting a spec with a zero slot duration or
    /// epoch length.
    pub fn new(spec: ChainSpec) -> Result<Self, BeaconError> {
        spec.validate().map_err(BeaconError::InvalidSpec)?;
        Ok(Self {
            spec,
            genesis_time: OnceLock::new(),
            ttd_timestamp: RwLock::new(None),
            ttd_slot: OnceLock::new(),
        })
    }

    pub fn spec(&self) -> &ChainSpec {
        &self.spec
    }

    /// Returns the genesis time, fetching it through `gateway` if unknown.
    ///
    /// A failed fetch is not an error: it yields `None` and the next call
    /// tries again.
    pub fn genesis_time<G: Gateway>(&self, gateway: &G) -> Option<u64> {
        if let Some(t) = self.genesis_time.get() {
            return Some(*t);
        }
        match gateway.get::<Genesis>(GENESIS_ENDPOINT) {
            Ok(genesis) => {
                let t = *self.genesis_time.get_or_init(|| genesis.genesis_time);
                tracing::info!(base_url = gateway.base_url(), genesis_time = t, "cached genesis time");
                Some(t)
            }
            Err(e) => {
                tracing::debug!(base_url = gateway.base_url(), "genesis time unavailable: {e}");
                None
            }
        }
    }

    /// Slot containing UNIX time `t` (seconds).
    pub fn slot_at_time<G: Gateway>(&self, gateway: &G, t: u64) -> Result<u64, BeaconError> {
        let genesis = self
            .genesis_time(gateway)
            .ok_or(BeaconError::GenesisUnavailable)?;
        slot_at(&self.spec, genesis, t)
    }

    /// Slot containing the current time of `clock`.
    pub fn current_slot<G: Gateway, C: Clock>(
        &self,
        gateway: &G,
        clock: &C,
    ) -> Result<u64, BeaconError> {
        self.slot_at_time(gateway, clock.now().as_secs())
    }

    /// Records the timestamp of the terminal total difficulty block.
    ///
    /// Has no effect on a TTD slot that was already resolved.
    pub fn update_ttd_timestamp(&self, timestamp: u64) {
        let mut guard = self
            .ttd_timestamp
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(timestamp);
    }

    pub fn ttd_timestamp(&self) -> Option<u64> {
        *self
            .ttd_timestamp
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Slot of the TTD block, or `None` while no TTD timestamp is known.
    pub fn ttd_slot<G: Gateway>(&self, gateway: &G) -> Result<Option<u64>, BeaconError> {
        if let Some(slot) = self.ttd_slot.get() {
            return Ok(Some(*slot));
        }
        let Some(timestamp) = self.ttd_timestamp() else {
            return Ok(None);
        };
        let slot = self.slot_at_time(gateway, timestamp)?;
        Ok(Some(*self.ttd_slot.get_or_init(|| slot)))
    }
}

/// `⌊(t − genesis) / seconds_per_slot⌋`, failing for times before genesis.
pub fn slot_at(spec: &ChainSpec, genesis: u64, t: u64) -> Result<u64, BeaconError> {
    if t < genesis {
        return Err(BeaconError::PreGenesis { time: t, genesis });
    }
    (t - genesis)
        .checked_div(spec.seconds_per_slot)
        .ok_or_else(|| BeaconError::InvalidSpec("SECONDS_PER_SLOT is zero".to_string()))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use super::Clock;

    /// Simulated clock: `sleep` advances time instantly.
    #[derive(Debug, Default)]
    pub struct ManualClock {
        now_ms: AtomicU64,
    }

    impl ManualClock {
        pub fn at_secs(secs: u64) -> Self {
            Self {
                now_ms: AtomicU64::new(secs * 1000),
            }
        }

        pub fn advance(&self, d: Duration) {
            self.now_ms.fetch_add(d.as_millis() as u64, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            Duration::from_millis(self.now_ms.load(Ordering::SeqCst))
        }

        fn sleep(&self, duration: Duration) {
            self.advance(duration);
        }
    }
}
