//! Attempt state machine for retryable fetches
//!
//! A fetch loop feeds the outcome of each attempt into [`RetryState::advance`]
//! and gets back what to do next: hand the result over, wait and try again, or
//! give up. Waiting goes through a [`Sleeper`] so the loop can be driven in
//! tests without real delays.

use crate::fetch::backoff::BackoffPolicy;
use crate::fetch::FetchError;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;

/// Number of attempts the HTTP strategy makes before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Retry limits and the two backoff curves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub transient: BackoffPolicy,
    pub rate_limited: BackoffPolicy,
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            transient: BackoffPolicy::transient(),
            rate_limited: BackoffPolicy::rate_limited(),
        }
    }
}

/// What a single attempt produced
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// The attempt produced a usable value
    Success(T),

    /// Network failure or unexpected status; worth retrying
    Transient(String),

    /// The server answered 429
    RateLimited,

    /// Retrying cannot help
    Fatal(FetchError),
}

/// Why a retry was scheduled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    Transient(String),
    RateLimited,
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(detail) => f.write_str(detail),
            Self::RateLimited => f.write_str("HTTP 429"),
        }
    }
}

/// Next step of the fetch loop
#[derive(Debug)]
pub enum Step<T> {
    /// Hand the value to the caller
    Done(T),

    /// Sleep for `delay`, then make attempt number `next_attempt` (0-based)
    Retry {
        delay: Duration,
        next_attempt: u32,
        reason: RetryReason,
    },

    /// Fatal outcome; stop immediately
    Failed(FetchError),

    /// All attempts used up; `last` is why the final attempt failed
    Exhausted { attempts: u32, last: RetryReason },
}

/// Tracks how many attempts a fetch has made
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Index of the attempt currently being made (0-based)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Consumes the outcome of the current attempt and decides the next step
    pub fn advance<T, R: Rng + ?Sized>(
        &mut self,
        outcome: AttemptOutcome<T>,
        rng: &mut R,
    ) -> Step<T> {
        let (curve, reason) = match outcome {
            AttemptOutcome::Success(value) => return Step::Done(value),
            AttemptOutcome::Fatal(error) => return Step::Failed(error),
            AttemptOutcome::Transient(detail) => {
                (self.policy.transient, RetryReason::Transient(detail))
            }
            AttemptOutcome::RateLimited => (self.policy.rate_limited, RetryReason::RateLimited),
        };

        let made = self.attempt + 1;
        if made >= self.policy.max_attempts {
            return Step::Exhausted {
                attempts: made,
                last: reason,
            };
        }

        let delay = curve.delay(self.attempt, rng);
        self.attempt = made;
        Step::Retry {
            delay,
            next_attempt: made,
            reason,
        }
    }
}

/// Abstraction over waiting, so retry loops can be tested without real time
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested sleeps and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// All durations requested so far, in order
    pub fn recorded(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .map(|slept| slept.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(3)
    }

    #[test]
    fn test_success_on_first_attempt() {
        let mut state = RetryState::new(RetryPolicy::default());
        let step = state.advance(AttemptOutcome::Success("body"), &mut rng());
        assert!(matches!(step, Step::Done("body")));
        assert_eq!(state.attempt(), 0);
    }

    #[test]
    fn test_transient_schedules_retry_on_transient_curve() {
        let policy = RetryPolicy::default();
        let mut state = RetryState::new(policy);
        let step = state.advance::<(), _>(AttemptOutcome::Transient("503".into()), &mut rng());

        match step {
            Step::Retry {
                delay,
                next_attempt,
                reason,
            } => {
                assert_eq!(next_attempt, 1);
                assert_eq!(reason, RetryReason::Transient("503".into()));
                assert!(delay >= policy.transient.ceiling(0));
                assert!(delay <= policy.transient.ceiling(0) + policy.transient.max_jitter);
            }
            other => panic!("expected retry, got {:?}", other),
        }
    }

    #[test]
    fn test_rate_limit_uses_long_curve() {
        let policy = RetryPolicy::default();
        let mut state = RetryState::new(policy);
        let step = state.advance::<(), _>(AttemptOutcome::RateLimited, &mut rng());

        match step {
            Step::Retry { delay, reason, .. } => {
                assert_eq!(reason, RetryReason::RateLimited);
                assert!(delay >= Duration::from_secs(2));
            }
            other => panic!("expected retry, got {:?}", other),
        }
    }

    #[test]
    fn test_exhausts_after_max_attempts() {
        let mut state = RetryState::new(RetryPolicy::with_max_attempts(6));
        let mut rng = rng();
        let mut retries = 0;

        loop {
            match state.advance::<(), _>(AttemptOutcome::Transient("timeout".into()), &mut rng) {
                Step::Retry { .. } => retries += 1,
                Step::Exhausted { attempts, .. } => {
                    assert_eq!(attempts, 6);
                    break;
                }
                other => panic!("unexpected step {:?}", other),
            }
        }

        assert_eq!(retries, 5);
    }

    #[test]
    fn test_fatal_stops_immediately() {
        let mut state = RetryState::new(RetryPolicy::default());
        let step = state.advance::<(), _>(
            AttemptOutcome::Fatal(FetchError::InvalidUrl {
                url: "nope".into(),
                detail: "relative URL without a base".into(),
            }),
            &mut rng(),
        );
        assert!(matches!(step, Step::Failed(FetchError::InvalidUrl { .. })));
    }

    #[test]
    fn test_single_attempt_policy_never_retries() {
        let mut state = RetryState::new(RetryPolicy::with_max_attempts(0));
        let step = state.advance::<(), _>(AttemptOutcome::RateLimited, &mut rng());
        assert!(matches!(
            step,
            Step::Exhausted {
                attempts: 1,
                last: RetryReason::RateLimited
            }
        ));
    }

    #[tokio::test]
    async fn test_recording_sleeper() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(Duration::from_millis(5)).await;
        sleeper.sleep(Duration::from_secs(1)).await;
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_millis(5), Duration::from_secs(1)]
        );
    }
}
