//! Backoff policy
//!
//! Decides whether a failed attempt may be retried and how long to wait.
//! Only retriable classes are retried, and never on the final allowed
//! attempt: with `max_retries = 3` the operation runs at most three times
//! with `1s, 2s` sleeps between attempts.

use std::time::Duration;

use meterguard_common::error::{CommonError, CommonResult};
use meterguard_common::resilience::ExponentialBackoff;
use meterguard_domain::{ErrorClass, OrchestratorConfig};

/// Retry eligibility and delay schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    backoff: ExponentialBackoff,
    max_retries: u32,
}

impl BackoffPolicy {
    pub fn new(
        max_retries: u32,
        initial: Duration,
        max: Option<Duration>,
    ) -> CommonResult<Self> {
        if max_retries == 0 {
            return Err(CommonError::config_field("max_retries", "must be at least 1"));
        }
        Ok(Self { backoff: ExponentialBackoff::new(initial, max)?, max_retries })
    }

    pub fn from_config(config: &OrchestratorConfig) -> CommonResult<Self> {
        Self::new(config.max_retries, config.initial_backoff, config.max_backoff)
    }

    /// Delay after the given 1-based attempt failed
    pub fn next_delay(&self, attempt: u32) -> Duration {
        self.backoff.delay_for(attempt)
    }

    /// Whether another attempt should follow the given failed attempt
    pub fn should_retry(&self, class: ErrorClass, attempt: u32) -> bool {
        class.is_retriable() && attempt < self.max_retries
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use meterguard_domain::{FatalKind, RetriableKind};

    use super::*;

    fn default_policy() -> BackoffPolicy {
        BackoffPolicy::from_config(&OrchestratorConfig::default()).unwrap()
    }

    /// Validates the default delay schedule.
    ///
    /// Assertions:
    /// - Confirms delays of 1s, 2s, 4s for attempts 1-3.
    #[test]
    fn test_next_delay_defaults() {
        let policy = default_policy();
        assert_eq!(policy.next_delay(1), Duration::from_secs(1));
        assert_eq!(policy.next_delay(2), Duration::from_secs(2));
        assert_eq!(policy.next_delay(3), Duration::from_secs(4));
    }

    /// Validates the retry tie-break on the final attempt.
    ///
    /// Assertions:
    /// - Confirms retriable classes retry while `attempt < max_retries`.
    /// - Confirms the final attempt is never retried.
    /// - Confirms fatal and unknown classes never retry.
    #[test]
    fn test_should_retry() {
        let policy = default_policy();
        let overloaded = ErrorClass::Retriable(RetriableKind::Overloaded);
        let limited = ErrorClass::Retriable(RetriableKind::RateLimited);

        assert!(policy.should_retry(overloaded, 1));
        assert!(policy.should_retry(limited, 2));
        assert!(!policy.should_retry(overloaded, 3));
        assert!(!policy.should_retry(limited, 4));

        assert!(!policy.should_retry(ErrorClass::Fatal(FatalKind::AuthInvalid), 1));
        assert!(!policy.should_retry(ErrorClass::Unknown, 1));
    }

    #[test]
    fn test_single_attempt_policy_never_retries() {
        let policy =
            BackoffPolicy::new(1, Duration::from_secs(1), Some(Duration::from_secs(1))).unwrap();
        assert!(!policy.should_retry(ErrorClass::Retriable(RetriableKind::Overloaded), 1));
    }

    #[test]
    fn test_new_rejects_zero_retries() {
        let err = BackoffPolicy::new(0, Duration::from_secs(1), None).unwrap_err();
        assert!(err.to_string().contains("max_retries"));
    }

    /// Validates the default schedule is uncapped for long retry budgets.
    ///
    /// Assertions:
    /// - Confirms `max_retries = 7` yields delays 1, 2, 4, 8, 16, 32 seconds.
    /// - Confirms an explicit cap still bounds the schedule.
    #[test]
    fn test_long_schedule_follows_doubling() {
        let config = OrchestratorConfig::builder().max_retries(7).build().unwrap();
        let policy = BackoffPolicy::from_config(&config).unwrap();
        let delays: Vec<u64> = (1..=6).map(|n| policy.next_delay(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32]);

        let capped = OrchestratorConfig::builder()
            .max_retries(7)
            .max_backoff(Duration::from_secs(10))
            .build()
            .unwrap();
        let policy = BackoffPolicy::from_config(&capped).unwrap();
        assert_eq!(policy.next_delay(6), Duration::from_secs(10));
    }
}
