//! Retry logic with exponential backoff for transient fetch failures.
//!
//! Failed fetches are classified into a [`FailureKind`]: transient failures
//! (timeouts, network errors, 5xx) are retried with exponential backoff and
//! jitter, permanent failures (404, other 4xx, invalid URLs) fail
//! immediately. Retries stay inside the fetch boundary; the assembler only
//! ever sees the final [`FetchResult`](super::FetchResult).

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use super::client::Fetcher;
use super::error::{FetchError, FetchResult};

/// Default maximum attempts, including the initial one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for the first retry.
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default maximum delay cap.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Maximum jitter added to delays.
const MAX_JITTER: Duration = Duration::from_millis(250);

/// Classification of fetch failures for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: timeout, connection refused, 5xx server errors, 429.
    Transient,

    /// Failure that will not succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, 400 Bad Request, invalid URL.
    Permanent,
}

/// Classifies a fetch error for retry purposes.
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureKind {
    match error {
        FetchError::Network { .. } | FetchError::Timeout { .. } => FailureKind::Transient,
        FetchError::HttpStatus { status, .. } if *status >= 500 || *status == 429 => {
            FailureKind::Transient
        }
        FetchError::HttpStatus { .. }
        | FetchError::NotFound { .. }
        | FetchError::InvalidUrl { .. } => FailureKind::Permanent,
    }
}

/// Decision on whether to retry a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// Delay calculation: `min(base * multiplier^(attempt-1), max) + jitter`.
/// With defaults, delays are approximately 500ms, 1s (before hitting max
/// attempts).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom settings; `max_attempts` is clamped to
    /// at least 1 (the initial attempt always runs).
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Creates a policy with a custom attempt limit and default delays.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides whether attempt `attempt` (1-indexed) should be followed by
    /// another try.
    #[must_use]
    pub fn should_retry(&self, kind: FailureKind, attempt: u32) -> RetryDecision {
        if kind == FailureKind::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure".to_string(),
            };
        }
        if attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) reached", self.max_attempts),
            };
        }
        RetryDecision::Retry {
            delay: self.delay_for_attempt(attempt),
            attempt: attempt + 1,
        }
    }

    /// Calculates the backoff delay after the given attempt, with jitter.
    ///
    /// Computed in `f64` so large base delays keep their precision.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier =
            f64::from(self.backoff_multiplier).powi(i32::try_from(exponent).unwrap_or(i32::MAX));
        let base_ms = self.base_delay.as_millis() as f64;
        let delay = Duration::from_millis((base_ms * multiplier) as u64).min(self.max_delay);

        let jitter_ms = rand::thread_rng().gen_range(0..=MAX_JITTER.as_millis() as u64);
        delay + Duration::from_millis(jitter_ms)
    }
}

/// Fetches `source`, retrying transient failures per `policy`.
///
/// Returns the first success or the final error once retries are exhausted
/// or the failure is permanent.
pub async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    source: &str,
    policy: &RetryPolicy,
) -> FetchResult {
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match fetcher.fetch(source).await {
            Ok(bytes) => return Ok(bytes),
            Err(error) => {
                let kind = classify_error(&error);
                match policy.should_retry(kind, attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next_attempt,
                    } => {
                        debug!(
                            url = %source,
                            attempt = next_attempt,
                            max_attempts = policy.max_attempts(),
                            delay_ms = delay.as_millis(),
                            error = %error,
                            "retrying fetch"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        debug!(url = %source, %reason, "not retrying fetch");
                        return Err(error);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[test]
    fn test_classify_timeout_is_transient() {
        let error = FetchError::timeout("http://x/a");
        assert_eq!(classify_error(&error), FailureKind::Transient);
    }

    #[test]
    fn test_classify_server_errors_transient() {
        for status in [500, 502, 503, 429] {
            let error = FetchError::http_status("http://x/a", status);
            assert_eq!(
                classify_error(&error),
                FailureKind::Transient,
                "status {status}"
            );
        }
    }

    #[test]
    fn test_classify_client_errors_permanent() {
        for status in [400, 401, 403, 410] {
            let error = FetchError::http_status("http://x/a", status);
            assert_eq!(
                classify_error(&error),
                FailureKind::Permanent,
                "status {status}"
            );
        }
    }

    #[test]
    fn test_classify_not_found_and_invalid_url_permanent() {
        assert_eq!(
            classify_error(&FetchError::not_found("http://x/a")),
            FailureKind::Permanent
        );
        assert_eq!(
            classify_error(&FetchError::invalid_url("nope")),
            FailureKind::Permanent
        );
    }

    #[test]
    fn test_should_retry_permanent_never_retries() {
        let policy = RetryPolicy::default();
        assert!(matches!(
            policy.should_retry(FailureKind::Permanent, 1),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_should_retry_stops_at_max_attempts() {
        let policy = RetryPolicy::with_max_attempts(3);
        assert!(matches!(
            policy.should_retry(FailureKind::Transient, 1),
            RetryDecision::Retry { attempt: 2, .. }
        ));
        assert!(matches!(
            policy.should_retry(FailureKind::Transient, 2),
            RetryDecision::Retry { attempt: 3, .. }
        ));
        assert!(matches!(
            policy.should_retry(FailureKind::Transient, 3),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_max_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::with_max_attempts(0).max_attempts(), 1);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::new(
            10,
            Duration::from_millis(100),
            Duration::from_millis(400),
            2.0,
        );
        let delay = |attempt| match policy.should_retry(FailureKind::Transient, attempt) {
            RetryDecision::Retry { delay, .. } => delay,
            RetryDecision::DoNotRetry { .. } => panic!("expected retry"),
        };
        // Jitter adds at most MAX_JITTER on top of the deterministic base.
        let d1 = delay(1);
        assert!(d1 >= Duration::from_millis(100) && d1 <= Duration::from_millis(100) + MAX_JITTER);
        let d2 = delay(2);
        assert!(d2 >= Duration::from_millis(200) && d2 <= Duration::from_millis(200) + MAX_JITTER);
        // Capped at max_delay regardless of attempt count.
        let d9 = delay(9);
        assert!(d9 <= Duration::from_millis(400) + MAX_JITTER);
    }

    /// Fetcher that fails a fixed number of times before succeeding.
    struct FlakyFetcher {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Fetcher for FlakyFetcher {
        async fn fetch(&self, source: &str) -> FetchResult {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(FetchError::http_status(source, 503))
            } else {
                Ok(b"ok".to_vec())
            }
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(2),
            1.0,
        )
    }

    #[tokio::test]
    async fn test_fetch_with_retry_recovers_from_transient_failures() {
        let fetcher = FlakyFetcher {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let result = fetch_with_retry(&fetcher, "http://x/a", &fast_policy(3)).await;
        assert_eq!(result.unwrap(), b"ok");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_with_retry_exhausts_attempts() {
        let fetcher = FlakyFetcher {
            failures: 10,
            calls: AtomicU32::new(0),
        };
        let result = fetch_with_retry(&fetcher, "http://x/a", &fast_policy(2)).await;
        assert!(matches!(
            result,
            Err(FetchError::HttpStatus { status: 503, .. })
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_with_retry_permanent_fails_immediately() {
        struct NotFoundFetcher {
            calls: AtomicU32,
        }

        #[async_trait]
        impl Fetcher for NotFoundFetcher {
            async fn fetch(&self, source: &str) -> FetchResult {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::not_found(source))
            }
        }

        let fetcher = NotFoundFetcher {
            calls: AtomicU32::new(0),
        };
        let result = fetch_with_retry(&fetcher, "http://x/a", &fast_policy(5)).await;
        assert!(matches!(result, Err(FetchError::NotFound { .. })));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
