//! 429 handling for a single logical call.
//!
//! The loop has two states. In `Normal` the call is issued. A `RateLimited`
//! outcome with a `Retry-After` moves it to `Backoff`, where it sleeps for
//! exactly the server-provided duration and then returns to `Normal` to
//! re-issue the identical request. There is no jitter and no exponential
//! growth. Every other outcome leaves the loop.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::error::SluiceError;
use crate::sleeper::Sleeper;

/// How many rate-limited retries a single logical call may perform.
///
/// The default is unbounded: the upstream guarantees availability within its
/// own window, so production callers keep waiting. Tests and impatient
/// callers can cap it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    max_retries: Option<u32>,
}

impl RetryPolicy {
    /// Retries every 429 for as long as the server keeps sending them.
    pub fn unbounded() -> Self {
        Self { max_retries: None }
    }

    /// Retries at most `max_retries` times, then surfaces the 429.
    pub fn capped(max_retries: u32) -> Self {
        Self {
            max_retries: Some(max_retries),
        }
    }

    /// Returns the cap, if any.
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Returns true if another retry is allowed after `performed` retries.
    pub fn allows(&self, performed: u32) -> bool {
        self.max_retries.is_none_or(|max| performed < max)
    }
}

/// Reads `Retry-After` as a positive whole number of seconds.
///
/// HTTP-date values and zero are treated as absent.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Runs `f` until it stops failing with a retryable 429.
///
/// Each attempt calls `f` again, so the closure must rebuild the identical
/// request every time.
pub(crate) async fn with_rate_limit_retry<T, F, Fut>(
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    operation: &str,
    f: F,
) -> Result<T, SluiceError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, SluiceError>>,
{
    let mut retries = 0u32;

    loop {
        match f().await {
            Ok(result) => {
                if retries > 0 {
                    tracing::debug!(operation = operation, retries = retries, "Recovered after rate limiting");
                }
                return Ok(result);
            }
            Err(SluiceError::RateLimited {
                retry_after: Some(delay),
            }) => {
                if !policy.allows(retries) {
                    tracing::warn!(
                        operation = operation,
                        retries = retries,
                        "Rate limit retry cap reached"
                    );
                    return Err(SluiceError::RateLimited {
                        retry_after: Some(delay),
                    });
                }
                retries += 1;

                tracing::warn!(
                    operation = operation,
                    attempt = retries,
                    delay_secs = delay.as_secs(),
                    "Rate limited, waiting for Retry-After"
                );

                sleeper.sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sleeper::RecordingSleeper;
    use reqwest::header::HeaderValue;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn headers_with_retry_after(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let headers = headers_with_retry_after("3");
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_parse_retry_after_rejects_missing_zero_and_dates() {
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
        assert_eq!(parse_retry_after(&headers_with_retry_after("0")), None);
        assert_eq!(
            parse_retry_after(&headers_with_retry_after("Wed, 21 Oct 2015 07:28:00 GMT")),
            None
        );
    }

    #[test]
    fn test_policy_allows() {
        assert!(RetryPolicy::unbounded().allows(u32::MAX - 1));
        assert!(RetryPolicy::capped(2).allows(1));
        assert!(!RetryPolicy::capped(2).allows(2));
        assert!(!RetryPolicy::capped(0).allows(0));
    }

    #[tokio::test]
    async fn test_retries_until_success_with_exact_delay() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = with_rate_limit_retry(RetryPolicy::unbounded(), &sleeper, "test", move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(SluiceError::RateLimited {
                    retry_after: Some(Duration::from_secs(3)),
                })
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_secs(3), Duration::from_secs(3)]
        );
    }

    #[tokio::test]
    async fn test_cap_surfaces_rate_limited() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> =
            with_rate_limit_retry(RetryPolicy::capped(1), &sleeper, "test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SluiceError::RateLimited {
                    retry_after: Some(Duration::from_secs(1)),
                })
            })
            .await;

        assert!(result.unwrap_err().is_rate_limit());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sleeper.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_retry_after_fails_immediately() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> =
            with_rate_limit_retry(RetryPolicy::unbounded(), &sleeper, "test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SluiceError::RateLimited { retry_after: None })
            })
            .await;

        assert!(matches!(
            result,
            Err(SluiceError::RateLimited { retry_after: None })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_terminal_errors_are_not_retried() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> =
            with_rate_limit_retry(RetryPolicy::unbounded(), &sleeper, "test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SluiceError::NotAuthenticated)
            })
            .await;

        assert!(matches!(result, Err(SluiceError::NotAuthenticated)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
