use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Attempts between sweeps of keys whose quota has fully replenished
const PRUNE_EVERY: usize = 256;

/// Per-email login attempt limiter
pub struct LoginThrottle {
    limiter: KeyedLimiter,
    checks: AtomicUsize,
    prune_every: usize,
}

impl LoginThrottle {
    pub fn new(attempts_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(attempts_per_minute).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(Quota::per_minute(per_minute), PRUNE_EVERY)
    }

    fn with_quota(quota: Quota, prune_every: usize) -> Self {
        Self {
            limiter: RateLimiter::keyed(quota),
            checks: AtomicUsize::new(0),
            prune_every: prune_every.max(1),
        }
    }

    /// Consume one attempt for `email`; false once the quota is spent
    pub fn try_attempt(&self, email: &str) -> bool {
        let allowed = self.limiter.check_key(&email.trim().to_lowercase()).is_ok();
        let checks = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if checks % self.prune_every == 0 {
            self.prune();
        }
        allowed
    }

    /// Forget emails that are back to a full quota
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!(tracked = self.limiter.len(), "Pruned login throttle");
    }

    pub fn tracked_emails(&self) -> usize {
        self.limiter.len()
    }
}

impl std::fmt::Debug for LoginThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginThrottle")
            .field("tracked_emails", &self.tracked_emails())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn quota_is_per_email() {
        let throttle = LoginThrottle::new(2);
        assert!(throttle.try_attempt("a@x.io"));
        assert!(throttle.try_attempt("A@x.io"));
        assert!(!throttle.try_attempt("a@x.io"));
        assert!(throttle.try_attempt("b@x.io"));
    }

    #[test]
    fn replenished_emails_are_swept_periodically() {
        let quota = Quota::with_period(Duration::from_millis(10)).unwrap();
        let throttle = LoginThrottle::with_quota(quota, 4);
        for email in ["a@x.io", "b@x.io", "c@x.io"] {
            assert!(throttle.try_attempt(email));
        }
        assert_eq!(throttle.tracked_emails(), 3);

        std::thread::sleep(Duration::from_millis(50));
        // fourth attempt triggers the sweep; only the fresh key survives
        assert!(throttle.try_attempt("d@x.io"));
        assert_eq!(throttle.tracked_emails(), 1);
    }

    #[test]
    fn throttled_emails_survive_a_sweep() {
        let throttle = LoginThrottle::new(1);
        assert!(throttle.try_attempt("a@x.io"));
        assert!(!throttle.try_attempt("a@x.io"));
        throttle.prune();
        assert_eq!(throttle.tracked_emails(), 1);
        assert!(!throttle.try_attempt("a@x.io"));
    }
}
