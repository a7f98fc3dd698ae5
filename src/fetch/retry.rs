//! Retry state machine for metric requests.
//!
//! Each failed attempt is classified into an [`AttemptFailure`] and fed to
//! [`RetryState::next`], which decides how long to wait before the next
//! attempt or which error ends the fetch. No clocks or randomness live here:
//! jitter is sampled by the caller and passed in.

use std::time::Duration;

use rand::Rng;

use super::FetchError;

/// Retry limits and backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound of the random delay added after connection and request failures
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 7,
            initial_backoff: Duration::from_secs(3),
            max_backoff: Duration::from_secs(120),
            max_jitter: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Policy that retries immediately. Useful where wall-clock waits are unwanted.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Sample a jitter value in `[0, max_jitter)`.
    pub fn sample_jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let secs = rand::thread_rng().gen_range(0.0..self.max_jitter.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Why a single attempt did not produce a usable response.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptFailure {
    /// HTTP 429, with the provider's `Retry-After` if it sent a usable one
    RateLimited { retry_after: Option<Duration> },
    Timeout(String),
    Connect(String),
    /// Any other non-success status
    Status { status: u16, body: String },
    /// Request errors that are neither timeouts nor connection failures,
    /// including undecodable bodies
    Request(String),
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::RateLimited { .. } => write!(f, "rate limited (429)"),
            AttemptFailure::Timeout(msg) => write!(f, "request timed out: {}", msg),
            AttemptFailure::Connect(msg) => write!(f, "connection error: {}", msg),
            AttemptFailure::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            AttemptFailure::Request(msg) => write!(f, "request failed: {}", msg),
        }
    }
}

/// Progress through one fetch call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryState {
    pub attempts: u32,
    pub backoff: Duration,
}

/// What to do after a failed attempt.
#[derive(Debug)]
pub enum Step {
    Retry { wait: Duration, state: RetryState },
    GiveUp(FetchError),
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempts: 0,
            backoff: policy.initial_backoff,
        }
    }

    fn advanced(&self, policy: &RetryPolicy) -> Self {
        Self {
            attempts: self.attempts + 1,
            backoff: self.backoff.saturating_mul(2).min(policy.max_backoff),
        }
    }

    /// Transition after `failure`. `jitter` is only applied to connection and
    /// generic request failures.
    pub fn next(&self, policy: &RetryPolicy, failure: AttemptFailure, jitter: Duration) -> Step {
        let next = self.advanced(policy);
        let exhausted = next.attempts >= policy.max_attempts;

        match failure {
            AttemptFailure::RateLimited { retry_after } => {
                if exhausted {
                    return Step::GiveUp(FetchError::ExhaustedRetries {
                        attempts: next.attempts,
                        last: "rate limited (429)".to_string(),
                    });
                }
                Step::Retry {
                    wait: retry_after.unwrap_or(self.backoff),
                    state: next,
                }
            }
            AttemptFailure::Timeout(_) | AttemptFailure::Connect(_) if exhausted => {
                Step::GiveUp(FetchError::ExhaustedRetries {
                    attempts: next.attempts,
                    last: failure.to_string(),
                })
            }
            AttemptFailure::Timeout(_) => Step::Retry {
                wait: self.backoff.saturating_mul(2),
                state: next,
            },
            AttemptFailure::Connect(_) => Step::Retry {
                wait: self.backoff.saturating_add(jitter),
                state: next,
            },
            AttemptFailure::Status { status, body } if exhausted => {
                Step::GiveUp(FetchError::Upstream {
                    status,
                    message: body,
                })
            }
            AttemptFailure::Request(message) if exhausted => {
                Step::GiveUp(FetchError::Request(message))
            }
            AttemptFailure::Status { .. } | AttemptFailure::Request(_) => Step::Retry {
                wait: self.backoff.saturating_add(jitter),
                state: next,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    fn expect_retry(step: Step) -> (Duration, RetryState) {
        match step {
            Step::Retry { wait, state } => (wait, state),
            Step::GiveUp(e) => panic!("expected retry, got give-up: {}", e),
        }
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 7);
        assert_eq!(policy.initial_backoff, Duration::from_secs(3));
        assert_eq!(policy.max_backoff, Duration::from_secs(120));
    }

    #[test]
    fn test_rate_limited_uses_retry_after() {
        let state = RetryState::new(&policy());
        let (wait, next) = expect_retry(state.next(
            &policy(),
            AttemptFailure::RateLimited {
                retry_after: Some(Duration::from_secs(17)),
            },
            Duration::from_secs(1),
        ));

        assert_eq!(wait, Duration::from_secs(17));
        assert_eq!(next.attempts, 1);
        assert_eq!(next.backoff, Duration::from_secs(6));
    }

    #[test]
    fn test_rate_limited_falls_back_to_backoff() {
        let state = RetryState::new(&policy());
        let (wait, _) = expect_retry(state.next(
            &policy(),
            AttemptFailure::RateLimited { retry_after: None },
            Duration::ZERO,
        ));
        assert_eq!(wait, Duration::from_secs(3));
    }

    #[test]
    fn test_timeout_waits_double_backoff() {
        let state = RetryState::new(&policy());
        let (wait, next) = expect_retry(state.next(
            &policy(),
            AttemptFailure::Timeout("slow".into()),
            Duration::from_secs(1),
        ));

        assert_eq!(wait, Duration::from_secs(6));
        assert_eq!(next.backoff, Duration::from_secs(6));
    }

    #[test]
    fn test_connect_adds_jitter() {
        let state = RetryState::new(&policy());
        let (wait, _) = expect_retry(state.next(
            &policy(),
            AttemptFailure::Connect("refused".into()),
            Duration::from_millis(1500),
        ));
        assert_eq!(wait, Duration::from_millis(4500));
    }

    #[test]
    fn test_backoff_is_capped() {
        let mut state = RetryState::new(&policy());
        let mut policy = policy();
        policy.max_attempts = 100;

        for _ in 0..10 {
            let (_, next) = expect_retry(state.next(
                &policy,
                AttemptFailure::Connect("refused".into()),
                Duration::ZERO,
            ));
            state = next;
        }
        assert_eq!(state.backoff, Duration::from_secs(120));
    }

    #[test]
    fn test_connect_exhausts_on_seventh_failure() {
        let policy = policy();
        let mut state = RetryState::new(&policy);

        for _ in 0..6 {
            let (_, next) = expect_retry(state.next(
                &policy,
                AttemptFailure::Connect("refused".into()),
                Duration::ZERO,
            ));
            state = next;
        }
        assert_eq!(state.attempts, 6);

        match state.next(&policy, AttemptFailure::Connect("refused".into()), Duration::ZERO) {
            Step::GiveUp(FetchError::ExhaustedRetries { attempts, last }) => {
                assert_eq!(attempts, 7);
                assert!(last.contains("refused"));
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_upstream_failure_is_returned_as_is() {
        let state = RetryState {
            attempts: 6,
            backoff: Duration::from_secs(96),
        };

        match state.next(
            &policy(),
            AttemptFailure::Status {
                status: 503,
                body: "unavailable".into(),
            },
            Duration::ZERO,
        ) {
            Step::GiveUp(FetchError::Upstream { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "unavailable");
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_rate_limit_counts_toward_ceiling() {
        let state = RetryState {
            attempts: 6,
            backoff: Duration::from_secs(120),
        };
        let step = state.next(
            &policy(),
            AttemptFailure::RateLimited { retry_after: None },
            Duration::ZERO,
        );
        assert!(matches!(
            step,
            Step::GiveUp(FetchError::ExhaustedRetries { attempts: 7, .. })
        ));
    }

    #[test]
    fn test_huge_backoff_saturates() {
        let policy = RetryPolicy {
            max_attempts: 7,
            initial_backoff: Duration::MAX,
            max_backoff: Duration::MAX,
            max_jitter: Duration::from_secs(2),
        };
        let state = RetryState::new(&policy);

        let (wait, next) = expect_retry(state.next(
            &policy,
            AttemptFailure::Timeout("slow".into()),
            Duration::ZERO,
        ));
        assert_eq!(wait, Duration::MAX);
        assert_eq!(next.backoff, Duration::MAX);

        let (wait, _) = expect_retry(next.next(
            &policy,
            AttemptFailure::Connect("refused".into()),
            Duration::from_secs(1),
        ));
        assert_eq!(wait, Duration::MAX);
    }

    #[test]
    fn test_sample_jitter_within_bounds() {
        let policy = policy();
        for _ in 0..100 {
            assert!(policy.sample_jitter() < policy.max_jitter);
        }
        assert_eq!(RetryPolicy::immediate(3).sample_jitter(), Duration::ZERO);
    }
}
