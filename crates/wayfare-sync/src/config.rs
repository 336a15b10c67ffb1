//! Sync engine configuration.

use std::time::Duration;

/// How failed pushes are retried.
///
/// The defaults make one attempt per push with no backoff and never give
/// up on a record across passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made for one record within a single pass (at least 1).
    pub attempts_per_push: u32,
    /// Delay before the second attempt; doubles for each further attempt.
    pub backoff_base: Duration,
    /// Upper bound on any single backoff delay.
    pub backoff_max: Duration,
    /// Records that have failed this many times are left `failed` by
    /// `retry_failed`. `None` means no cap.
    pub max_sync_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.backoff_base
            .saturating_mul(1u32 << shift)
            .min(self.backoff_max)
    }

    /// Whether a record with this many recorded failures may be retried.
    pub fn allows_retry(&self, sync_attempts: u32) -> bool {
        self.max_sync_attempts.map_or(true, |max| sync_attempts < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts_per_push: 1,
            backoff_base: Duration::ZERO,
            backoff_max: Duration::ZERO,
            max_sync_attempts: None,
        }
    }
}

/// Configuration for sync behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Bound on a single push; a push that exceeds it counts as failed.
    pub push_timeout: Duration,
    /// Period of the automatic sync trigger while online. Zero turns the
    /// periodic trigger off; reconnects still start a pass.
    pub auto_sync_interval: Duration,
    /// Maximum pushes in flight during one pass. Clamped to
    /// `1..=Semaphore::MAX_PERMITS` when the pass starts.
    pub max_concurrent_pushes: usize,
    /// Retry behavior for failed pushes.
    pub retry: RetryPolicy,
}

impl SyncConfig {
    pub fn with_push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = timeout;
        self
    }

    pub fn with_auto_sync_interval(mut self, interval: Duration) -> Self {
        self.auto_sync_interval = interval;
        self
    }

    pub fn with_max_concurrent_pushes(mut self, max: usize) -> Self {
        self.max_concurrent_pushes = max;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            push_timeout: Duration::from_secs(30),
            auto_sync_interval: Duration::from_secs(5 * 60),
            max_concurrent_pushes: 16,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_never_caps() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(u32::MAX));
        assert_eq!(policy.backoff(1), Duration::ZERO);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            attempts_per_push: 4,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_millis(350),
            max_sync_attempts: Some(3),
        };

        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(40), Duration::from_millis(350));

        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }

    proptest::proptest! {
        #[test]
        fn prop_backoff_is_monotonic_and_capped(
            base_ms in 0u64..5_000,
            max_ms in 0u64..60_000,
            attempt in 1u32..64,
        ) {
            let policy = RetryPolicy {
                attempts_per_push: 64,
                backoff_base: Duration::from_millis(base_ms),
                backoff_max: Duration::from_millis(max_ms),
                max_sync_attempts: None,
            };
            let here = policy.backoff(attempt);
            proptest::prop_assert!(here <= policy.backoff_max);
            proptest::prop_assert!(here <= policy.backoff(attempt + 1));
        }
    }
}
