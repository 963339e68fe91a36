// Retry policy for the request executor.
//
// Decides whether a failed attempt is worth repeating and how long to
// wait first. The executor owns the loop; this module owns the numbers.

use std::time::Duration;

use reqwest::Method;

use crate::error::Error;

/// HTTP methods that may be repeated without duplicating side effects.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt. Default: 3.
    pub max_retries: u32,

    /// Base of the exponential delay. Default: 100ms.
    pub base_delay: Duration,

    /// Upper bound on a single delay. Default: 10s.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether to make another attempt after `retries_so_far` retries failed with `err`.
    pub fn should_retry(&self, retries_so_far: u32, method: &Method, err: &Error) -> bool {
        retries_so_far < self.max_retries && err.is_retryable_for(method)
    }

    /// Delay before retry number `retry` (1-based).
    ///
    /// `delay = min(base * 2^retry * jitter, max)` with jitter in `[1.0, 1.2]`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponential = self.base_delay.saturating_mul(1u32 << retry.min(16));

        // Deterministic spread seeded from the retry number.
        let jitter = 1.0 + 0.1 * (1.0 + (f64::from(retry) * 7.3).sin());

        exponential.mul_f64(jitter).min(self.max_delay)
    }
}
