//! Proactive self-throttling from rate limit headers.
//!
//! The upstream limits calls per account per minute, and the limiter is
//! shared by every integration on the account. After each successful call
//! the governor reads the current window from the response headers and,
//! when throttling is enabled, blocks for a coarse step delay once usage
//! crosses 70%, 80% or 90%.

use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::sleeper::Sleeper;

/// Header carrying the total calls allowed in the current window.
pub const RATE_LIMIT_TOTAL_HEADER: &str = "x-ratelimit-total";

/// Header carrying the calls left in the current window.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Usage thresholds (percent) and their delays, lowest first.
const THROTTLE_STEPS: [(f64, u64); 3] = [(70.0, 5), (80.0, 15), (90.0, 30)];

/// Rate limit window as reported by the latest response.
///
/// Read fresh from every response; nothing is carried across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateState {
    /// Calls allowed in the window.
    pub total: u64,
    /// Calls left in the window.
    pub remaining: u64,
}

impl RateState {
    /// Reads the window from response headers.
    ///
    /// Returns `None` if either header is absent, unparsable or not positive.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let total = read_positive(headers, RATE_LIMIT_TOTAL_HEADER)?;
        let remaining = read_positive(headers, RATE_LIMIT_REMAINING_HEADER)?;
        Some(Self { total, remaining })
    }

    /// Percentage of the window already used, rounded to two decimals.
    pub fn percent_used(&self) -> f64 {
        let used = self.total as f64 - self.remaining as f64;
        let percent = used / self.total as f64 * 100.0;
        (percent * 100.0).round() / 100.0
    }

    /// Delay the governor applies for this window, if any.
    ///
    /// Steps are checked from the lowest threshold upward and the last match
    /// wins, so the highest threshold crossed decides.
    pub fn throttle_delay(&self) -> Option<Duration> {
        let percent = self.percent_used();
        let mut delay = None;
        for (threshold, secs) in THROTTLE_STEPS {
            if percent >= threshold {
                delay = Some(Duration::from_secs(secs));
            }
        }
        delay
    }
}

fn read_positive(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n as u64)
}

/// Applies the throttle step for a successful response.
///
/// Returns the delay that was slept, if any.
pub(crate) async fn govern(
    headers: &HeaderMap,
    enabled: bool,
    sleeper: &dyn Sleeper,
) -> Option<Duration> {
    if !enabled {
        return None;
    }
    let state = RateState::from_headers(headers)?;
    let delay = state.throttle_delay()?;

    tracing::warn!(
        total = state.total,
        remaining = state.remaining,
        percent_used = state.percent_used(),
        delay_secs = delay.as_secs(),
        "Rate limit usage high, throttling"
    );
    sleeper.sleep(delay).await;
    Some(delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sleeper::RecordingSleeper;
    use reqwest::header::HeaderValue;

    fn state(total: u64, remaining: u64) -> RateState {
        RateState { total, remaining }
    }

    fn headers(total: &str, remaining: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_TOTAL_HEADER, HeaderValue::from_str(total).unwrap());
        headers.insert(
            RATE_LIMIT_REMAINING_HEADER,
            HeaderValue::from_str(remaining).unwrap(),
        );
        headers
    }

    #[test]
    fn test_percent_used_rounds_to_two_decimals() {
        assert_eq!(state(100, 25).percent_used(), 75.0);
        assert_eq!(state(3, 2).percent_used(), 33.33);
        assert_eq!(state(3, 1).percent_used(), 66.67);
    }

    #[test]
    fn test_throttle_step_table() {
        assert_eq!(state(100, 40).throttle_delay(), None);
        assert_eq!(state(100, 25).throttle_delay(), Some(Duration::from_secs(5)));
        assert_eq!(state(100, 15).throttle_delay(), Some(Duration::from_secs(15)));
        assert_eq!(state(100, 5).throttle_delay(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_throttle_boundaries_are_inclusive() {
        assert_eq!(state(100, 30).throttle_delay(), Some(Duration::from_secs(5)));
        assert_eq!(state(100, 20).throttle_delay(), Some(Duration::from_secs(15)));
        assert_eq!(state(100, 10).throttle_delay(), Some(Duration::from_secs(30)));
        assert_eq!(state(100, 31).throttle_delay(), None);
    }

    #[test]
    fn test_from_headers_requires_positive_values() {
        assert_eq!(RateState::from_headers(&HeaderMap::new()), None);
        assert_eq!(RateState::from_headers(&headers("100", "0")), None);
        assert_eq!(RateState::from_headers(&headers("0", "10")), None);
        assert_eq!(RateState::from_headers(&headers("-5", "10")), None);
        assert_eq!(RateState::from_headers(&headers("abc", "10")), None);
        assert_eq!(
            RateState::from_headers(&headers("100", "25")),
            Some(state(100, 25))
        );
    }

    #[tokio::test]
    async fn test_govern_sleeps_when_enabled() {
        let sleeper = RecordingSleeper::new();
        let slept = govern(&headers("100", "15"), true, &sleeper).await;
        assert_eq!(slept, Some(Duration::from_secs(15)));
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(15)]);
    }

    #[tokio::test]
    async fn test_govern_disabled_never_sleeps() {
        let sleeper = RecordingSleeper::new();
        let slept = govern(&headers("100", "5"), false, &sleeper).await;
        assert_eq!(slept, None);
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_govern_below_threshold_never_sleeps() {
        let sleeper = RecordingSleeper::new();
        assert_eq!(govern(&headers("100", "40"), true, &sleeper).await, None);
        assert!(sleeper.recorded().is_empty());
    }
}
