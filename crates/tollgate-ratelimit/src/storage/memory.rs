use std::{
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
};

use crate::error::RateLimitError;

type KeyedLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// Checks between sweeps of keys whose state has fully replenished
const PRUNE_EVERY: u64 = 1024;

/// In-process keyed limiter (GCRA via governor)
///
/// Allows a burst of `max_requests` and replenishes one request every
/// `window / max_requests`.
#[derive(Clone)]
pub struct MemoryLimiter {
    limiter: Arc<KeyedLimiter>,
    clock: DefaultClock,
    checks: Arc<AtomicU64>,
}

impl MemoryLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, RateLimitError> {
        let burst = NonZeroU32::new(max_requests)
            .ok_or_else(|| RateLimitError::Config("requests must be greater than zero".to_owned()))?;

        let period = window
            .checked_div(max_requests)
            .filter(|period| !period.is_zero())
            .ok_or_else(|| RateLimitError::Config(format!("window {window:?} is too short for {max_requests} requests")))?;

        let quota = Quota::with_period(period)
            .ok_or_else(|| RateLimitError::Config("invalid rate limit period".to_owned()))?
            .allow_burst(burst);

        Ok(Self {
            limiter: Arc::new(RateLimiter::dashmap(quota)),
            clock: DefaultClock::default(),
            checks: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn check(&self, key: &str) -> Result<(), RateLimitError> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune();
        }

        self.limiter.check_key(&key.to_owned()).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            RateLimitError::Exceeded {
                retry_after: wait.as_secs().max(1),
            }
        })
    }
}

impl MemoryLimiter {
    /// Forget keys that are indistinguishable from a fresh key
    fn prune(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();

        tracing::debug!(
            pruned = before.saturating_sub(self.limiter.len()),
            "pruned idle rate limit keys"
        );
    }
}

impl std::fmt::Debug for MemoryLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_reject() {
        let limiter = MemoryLimiter::new(3, Duration::from_secs(60)).unwrap();

        for _ in 0..3 {
            assert!(limiter.check("alice").is_ok());
        }

        match limiter.check("alice") {
            Err(RateLimitError::Exceeded { retry_after }) => assert!((1..=20).contains(&retry_after)),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn keys_are_independent() {
        let limiter = MemoryLimiter::new(1, Duration::from_secs(60)).unwrap();

        assert!(limiter.check("alice").is_ok());
        assert!(limiter.check("alice").is_err());
        assert!(limiter.check("bob").is_ok());
    }

    #[test]
    fn replenished_keys_are_pruned() {
        let limiter = MemoryLimiter::new(1, Duration::from_millis(20)).unwrap();
        assert!(limiter.check("alice").is_ok());
        assert!(limiter.check("bob").is_ok());
        assert_eq!(limiter.limiter.len(), 2);

        std::thread::sleep(Duration::from_millis(50));
        limiter.prune();

        assert_eq!(limiter.limiter.len(), 0);
        assert!(limiter.check("alice").is_ok());
    }

    #[test]
    fn checks_trigger_periodic_pruning() {
        let limiter = MemoryLimiter::new(1, Duration::from_millis(20)).unwrap();
        assert!(limiter.check("stale").is_ok());

        std::thread::sleep(Duration::from_millis(50));

        for i in 1..PRUNE_EVERY {
            let _ = limiter.check(&format!("user-{i}"));
        }

        assert!(limiter.limiter.len() < usize::try_from(PRUNE_EVERY).unwrap());
    }

    #[test]
    fn zero_requests_is_rejected() {
        assert!(matches!(
            MemoryLimiter::new(0, Duration::from_secs(1)),
            Err(RateLimitError::Config(_))
        ));
    }
}
