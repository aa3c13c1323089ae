//! Fixed-interval polling with an optional overall ceiling.

use std::time::Duration;

use crate::clock::Clock;

/// Interval between polls of the slot-close wait and the attestation scan.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Overall ceiling of an attestation scan.
pub const DEFAULT_ATTESTATION_TIMEOUT: Duration = Duration::from_secs(61);

/// Returned by [`RetryPolicy::poll`] when the ceiling is reached.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Elapsed(pub Duration);

/// Re-run an attempt every `interval` until it yields a value.
///
/// With `ceiling: None` the poll never gives up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub ceiling: Option<Duration>,
}

impl RetryPolicy {
    pub const fn new(interval: Duration, ceiling: Option<Duration>) -> Self {
        Self { interval, ceiling }
    }

    /// Polls forever at `interval`.
    pub const fn unbounded(interval: Duration) -> Self {
        Self::new(interval, None)
    }

    /// Runs `attempt` until it returns `Some`.
    ///
    /// After every unsuccessful attempt the policy sleeps one interval on
    /// `clock` and then checks the ceiling, measured from the first call.
    pub fn poll<C, T, F>(&self, clock: &C, mut attempt: F) -> Result<T, Elapsed>
    where
        C: Clock + ?Sized,
        F: FnMut() -> Option<T>,
    {
        let start = clock.now();
        loop {
            if let Some(value) = attempt() {
                return Ok(value);
            }
            clock.sleep(self.interval);
            let elapsed = clock.now().saturating_sub(start);
            if let Some(ceiling) = self.ceiling {
                if elapsed >= ceiling {
                    return Err(Elapsed(elapsed));
                }
            }
        }
    }
}
