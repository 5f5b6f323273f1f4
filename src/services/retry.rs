//! Shared retry/backoff policy for outbound HTTP calls.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::models::HttpConfig;

/// Bounded retry with jitterless exponential backoff.
///
/// Base delay and multiplier are configuration so tests can run with
/// near-zero delays; the schedule is deterministic by design.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
        }
    }

    /// Policy for feed fetches, straight from the HTTP config section.
    pub fn for_fetch(http: &HttpConfig) -> Self {
        Self::new(
            http.max_attempts,
            Duration::from_millis(http.backoff_base_ms),
            http.backoff_multiplier,
        )
    }

    /// Policy for message sends: its own attempt budget, shared backoff curve.
    pub fn for_notify(http: &HttpConfig, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::for_fetch(http)
        }
    }

    /// Delay before retrying after the given 1-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.mul_f64(self.multiplier.powi(exponent as i32))
    }
}

/// Whether a status signals throttling / temporary unavailability.
pub fn is_throttled(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 503)
}

/// Server-supplied retry delay, when present and numeric.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
