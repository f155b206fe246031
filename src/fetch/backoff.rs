//! Exponential backoff with a ceiling and random jitter

use rand::Rng;
use std::time::Duration;

/// Smallest delay any policy will produce
const MIN_DELAY: Duration = Duration::from_millis(1);

/// Maps an attempt index to a wait duration
///
/// `delay(attempt) = min(base * 2^attempt, cap) + uniform(0..=max_jitter)`
///
/// The policy does not cap the number of attempts; the caller decides when to
/// give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay for attempt 0, before jitter
    pub base: Duration,

    /// Upper bound of the exponential term
    pub cap: Duration,

    /// Upper bound of the uniform jitter added on top
    pub max_jitter: Duration,
}

impl BackoffPolicy {
    /// Creates a policy from its three parameters
    pub const fn new(base: Duration, cap: Duration, max_jitter: Duration) -> Self {
        Self {
            base,
            cap,
            max_jitter,
        }
    }

    /// Curve for network errors and unexpected status codes
    pub const fn transient() -> Self {
        Self::new(
            Duration::from_millis(800),
            Duration::from_secs(30),
            Duration::from_millis(300),
        )
    }

    /// Longer curve for HTTP 429 responses
    pub const fn rate_limited() -> Self {
        Self::new(
            Duration::from_secs(2),
            Duration::from_secs(60),
            Duration::from_millis(500),
        )
    }

    /// The deterministic part of the delay for `attempt`
    ///
    /// Non-decreasing in `attempt`, saturating at `cap` instead of overflowing.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let base = self.base.max(MIN_DELAY);
        let cap = self.cap.max(MIN_DELAY);
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        base.saturating_mul(factor).min(cap)
    }

    /// Full delay for `attempt`, jitter drawn from `rng`
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rng.random_range(0..=jitter_ms)
        };
        self.ceiling(attempt) + Duration::from_millis(jitter)
    }

    /// Largest delay this policy can ever return
    pub fn max_delay(&self) -> Duration {
        self.cap.max(MIN_DELAY) + self.max_jitter
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_transient_curve() {
        let policy = BackoffPolicy::transient();
        assert_eq!(policy.ceiling(0), Duration::from_millis(800));
        assert_eq!(policy.ceiling(1), Duration::from_millis(1600));
        assert_eq!(policy.ceiling(3), Duration::from_millis(6400));
        assert_eq!(policy.ceiling(6), Duration::from_secs(30));
    }

    #[test]
    fn test_rate_limited_curve() {
        let policy = BackoffPolicy::rate_limited();
        let expected = [2, 4, 8, 16, 32, 60, 60];
        for (attempt, secs) in expected.iter().enumerate() {
            assert_eq!(policy.ceiling(attempt as u32), Duration::from_secs(*secs));
        }
    }

    #[test]
    fn test_delay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for policy in [BackoffPolicy::transient(), BackoffPolicy::rate_limited()] {
            for attempt in 0..40 {
                for _ in 0..20 {
                    let delay = policy.delay(attempt, &mut rng);
                    assert!(delay > Duration::ZERO);
                    assert!(delay >= policy.ceiling(attempt));
                    assert!(delay <= policy.max_delay());
                }
            }
        }
    }

    #[test]
    fn test_ceiling_is_monotonic() {
        let policy = BackoffPolicy::transient();
        let mut previous = Duration::ZERO;
        for attempt in 0..64 {
            let current = policy.ceiling(attempt);
            assert!(current >= previous, "attempt {} went backwards", attempt);
            previous = current;
        }
    }

    #[test]
    fn test_mean_delay_non_decreasing() {
        let policy = BackoffPolicy::transient();
        let mut rng = StdRng::seed_from_u64(42);
        let samples = 500;

        let mean = |attempt: u32, rng: &mut StdRng| -> f64 {
            let total: f64 = (0..samples)
                .map(|_| policy.delay(attempt, rng).as_secs_f64())
                .sum();
            total / samples as f64
        };

        let mut previous = mean(0, &mut rng);
        for attempt in 1..8 {
            let current = mean(attempt, &mut rng);
            // Once the cap is reached only jitter noise remains; allow for it.
            assert!(
                current + policy.max_jitter.as_secs_f64() / 2.0 >= previous,
                "mean delay dropped at attempt {}: {} < {}",
                attempt,
                current,
                previous
            );
            previous = current;
        }
    }

    #[test]
    fn test_zero_base_never_returns_zero() {
        let policy = BackoffPolicy::new(Duration::ZERO, Duration::ZERO, Duration::ZERO);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(policy.delay(0, &mut rng), MIN_DELAY);
        assert_eq!(policy.delay(100, &mut rng), MIN_DELAY);
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let policy = BackoffPolicy::rate_limited();
        assert_eq!(policy.ceiling(u32::MAX), Duration::from_secs(60));
    }
}
