//! Retry logic with configurable backoff for provider calls.

use std::time::Duration;

use seoforge_types::{ProviderError, SeoforgeError};

/// Backoff policy controlling the wait before each retry.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffPolicy {
    /// Fixed delay between retries.
    Fixed(Duration),
    /// `multiplier * 2^retry`, clamped into `[min, max]`.
    Exponential {
        multiplier: Duration,
        min: Duration,
        max: Duration,
    },
    /// No delay between retries.
    None,
}

impl BackoffPolicy {
    /// Compute the wait before retry number `retry` (1-indexed).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        match self {
            BackoffPolicy::Fixed(d) => *d,
            BackoffPolicy::Exponential {
                multiplier,
                min,
                max,
            } => {
                let millis = (multiplier.as_millis() as u64).saturating_mul(2u64.saturating_pow(retry));
                Duration::from_millis(millis).clamp(*min, (*max).max(*min))
            }
            BackoffPolicy::None => Duration::ZERO,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Exponential {
            multiplier: Duration::from_secs(1),
            min: Duration::from_secs(2),
            max: Duration::from_secs(10),
        }
    }
}

/// How many times to attempt a call and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: usize,
    pub backoff: BackoffPolicy,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, backoff: BackoffPolicy) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// A single attempt, no retries.
    pub fn no_retry() -> Self {
        Self::new(1, BackoffPolicy::None)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, BackoffPolicy::default())
    }
}

/// Execute a provider call with retry.
///
/// The closure `f` is called up to `policy.max_attempts` times. A terminal
/// failure (see [`ProviderError::classify`]) returns
/// [`SeoforgeError::TerminalProvider`] immediately; a retryable failure on the
/// last attempt returns [`SeoforgeError::RetriesExhausted`].
pub async fn execute_with_retry<T, F, Fut>(
    f: F,
    policy: &RetryPolicy,
    operation: &str,
) -> seoforge_types::Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_terminal() => {
                tracing::warn!(operation = %operation, attempt, kind = %e.kind, error = %e, "Non-retryable provider error");
                return Err(SeoforgeError::TerminalProvider(e));
            }
            Err(e) if attempt >= max_attempts => {
                tracing::warn!(operation = %operation, attempts = attempt, error = %e, "Retries exhausted");
                return Err(SeoforgeError::RetriesExhausted {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => {
                let delay = policy.backoff.delay_for_retry(attempt as u32);
                tracing::warn!(operation = %operation, attempt, delay_ms = %delay.as_millis(), error = %e, "Retryable error, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seoforge_types::ProviderErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn err(kind: ProviderErrorKind, message: &str) -> ProviderError {
        ProviderError::new("test", kind, message)
    }

    // 1. Success on first try
    #[tokio::test]
    async fn success_on_first_try() {
        let result = execute_with_retry(|| async { Ok::<_, ProviderError>("done") }, &RetryPolicy::default(), "op").await;
        assert_eq!(result.unwrap(), "done");
    }

    // 2. Retryable error succeeds on second try
    #[tokio::test]
    async fn retry_on_retryable_error_succeeds() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = call_count.clone();
        let policy = RetryPolicy::new(3, BackoffPolicy::None);

        let result = execute_with_retry(
            move || {
                let cc = cc.clone();
                async move {
                    if cc.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(err(ProviderErrorKind::RateLimited, "slow down"))
                    } else {
                        Ok("recovered")
                    }
                }
            },
            &policy,
            "op",
        )
        .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    // 3. Exhaustion reports attempts and the last error
    #[tokio::test]
    async fn max_attempts_exhausted() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = call_count.clone();
        let policy = RetryPolicy::new(3, BackoffPolicy::None);

        let result: seoforge_types::Result<()> = execute_with_retry(
            move || {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                async move { Err(err(ProviderErrorKind::ServerError, &format!("fail {n}"))) }
            },
            &policy,
            "op",
        )
        .await;

        match result.unwrap_err() {
            SeoforgeError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last.message, "fail 2");
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    // 4. Terminal error is not retried
    #[tokio::test]
    async fn terminal_error_returns_immediately() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = call_count.clone();

        let result: seoforge_types::Result<()> = execute_with_retry(
            move || {
                cc.fetch_add(1, Ordering::SeqCst);
                async { Err(err(ProviderErrorKind::Unknown, "Invalid API key")) }
            },
            &RetryPolicy::default(),
            "op",
        )
        .await;

        assert!(matches!(result.unwrap_err(), SeoforgeError::TerminalProvider(_)));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    // 5. Default exponential policy waits 2s then 4s
    #[test]
    fn default_backoff_waits() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for_retry(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for_retry(30), Duration::from_secs(10));
    }

    // 6. Exponential policy clamps to the minimum
    #[test]
    fn exponential_backoff_respects_min() {
        let policy = BackoffPolicy::Exponential {
            multiplier: Duration::from_millis(100),
            min: Duration::from_millis(500),
            max: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_retry(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for_retry(4), Duration::from_secs(1));
    }

    // 7. Fixed backoff returns constant delay
    #[test]
    fn fixed_backoff_constant_delay() {
        let policy = BackoffPolicy::Fixed(Duration::from_millis(200));
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_retry(9), Duration::from_millis(200));
    }

    // 8. Sleeps follow the policy under a paused clock
    #[tokio::test(start_paused = true)]
    async fn rate_limited_call_waits_two_then_four_seconds() {
        let started = tokio::time::Instant::now();
        let timestamps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let ts = timestamps.clone();

        let result: seoforge_types::Result<()> = execute_with_retry(
            move || {
                ts.lock().unwrap().push(started.elapsed());
                async { Err(err(ProviderErrorKind::Unknown, "rate limit exceeded")) }
            },
            &RetryPolicy::default(),
            "op",
        )
        .await;

        assert!(matches!(
            result.unwrap_err(),
            SeoforgeError::RetriesExhausted { attempts: 3, .. }
        ));
        let ts = timestamps.lock().unwrap();
        assert_eq!(ts.len(), 3);
        assert_eq!(ts[1] - ts[0], Duration::from_secs(2));
        assert_eq!(ts[2] - ts[1], Duration::from_secs(4));
    }

    // 9. Zero attempts still calls once
    #[tokio::test]
    async fn zero_attempts_treated_as_one() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = call_count.clone();
        let policy = RetryPolicy::new(0, BackoffPolicy::None);

        let result: seoforge_types::Result<()> = execute_with_retry(
            move || {
                cc.fetch_add(1, Ordering::SeqCst);
                async { Err(err(ProviderErrorKind::Timeout, "deadline")) }
            },
            &policy,
            "op",
        )
        .await;

        assert!(matches!(
            result.unwrap_err(),
            SeoforgeError::RetriesExhausted { attempts: 1, .. }
        ));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}
