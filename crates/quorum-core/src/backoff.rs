//! Retry with exponential backoff and fail-fast on permanent errors.
//!
//! Every external model call in the pipeline goes through
//! [`BackoffPolicy::retry`]. Errors whose message contains one of
//! [`NON_RETRYABLE_MARKERS`] (case-insensitive) are returned immediately;
//! everything else is retried until `max_attempts` is exhausted, sleeping
//! `base_delay * 2^(attempt-1)` before each retry.
//!
//! The executor does not log. Callers decide what a failure means.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Substrings that classify an error as permanent (auth or validation).
pub const NON_RETRYABLE_MARKERS: &[&str] = &[
    "401",
    "403",
    "invalid_api_key",
    "invalid api key",
    "authentication",
    "authorization",
    "400",
    "bad request",
    "invalid request",
];

/// Default attempts for worker and judge calls.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Returns `true` when `message` names an auth/validation failure.
pub fn is_non_retryable(message: &str) -> bool {
    let lower = message.to_lowercase();
    NON_RETRYABLE_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Attempt budget and delay schedule for one class of calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Total attempts including the first (0 behaves like 1).
    pub max_attempts: u32,
    /// Sleep before the first retry; doubles on each further retry.
    pub base_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Same delay schedule with a different attempt budget.
    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..self
        }
    }

    /// Delay slept after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent. The last error is returned unchanged.
    pub async fn retry<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= max_attempts || is_non_retryable(&err.to_string()) {
                        return Err(err);
                    }
                    tokio::time::sleep(self.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// [`BackoffPolicy::retry`] with the default policy (3 attempts, 100ms).
pub async fn with_backoff<T, E, F, Fut>(operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    BackoffPolicy::default().retry(operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_op(
        calls: Arc<AtomicU32>,
        fail_times: u32,
        message: &'static str,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<&'static str, String>> + Send>>
    {
        move || {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < fail_times {
                    Err(message.to_string())
                } else {
                    Ok("done")
                }
            })
        }
    }

    #[test]
    fn test_marker_matching_is_case_insensitive() {
        assert!(is_non_retryable("401 Unauthorized"));
        assert!(is_non_retryable("Error: Invalid API Key provided"));
        assert!(is_non_retryable("AuthenticationError: nope"));
        assert!(is_non_retryable("BAD REQUEST: missing field"));
        assert!(is_non_retryable("code=invalid_api_key"));
        assert!(!is_non_retryable("503 Service Unavailable"));
        assert!(!is_non_retryable("connection reset by peer"));
        assert!(!is_non_retryable("429 rate limited"));
    }

    #[test]
    fn test_delay_schedule_doubles() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_saturates_instead_of_overflowing() {
        let policy = BackoffPolicy::new(100, Duration::from_secs(1));
        assert!(policy.delay_for(90) >= Duration::from_secs(u32::MAX as u64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();

        let result = BackoffPolicy::default()
            .retry(counting_op(Arc::clone(&calls), 2, "503 upstream"))
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms before the first retry, 200ms before the second
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(300));
        assert!(waited < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_uses_every_attempt() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = BackoffPolicy::new(4, Duration::from_millis(10))
            .retry(counting_op(Arc::clone(&calls), u32::MAX, "timeout"))
            .await;

        assert_eq!(result.unwrap_err(), "timeout");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();

        let result = with_backoff(counting_op(Arc::clone(&calls), u32::MAX, "401 Unauthorized"))
            .await;

        assert_eq!(result.unwrap_err(), "401 Unauthorized");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = BackoffPolicy::new(0, Duration::from_millis(10))
            .retry(counting_op(Arc::clone(&calls), u32::MAX, "boom"))
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
