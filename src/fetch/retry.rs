//! Retry policy for logical fetches
//!
//! | Outcome | Action |
//! |---------|--------|
//! | HTTP 429 | Retry after 2000ms + up to 1000ms jitter |
//! | HTTP 503 / 504 | Retry after 1000ms |
//! | Connection reset / timeout | Retry after 1000ms |
//! | Other transport error | Fail immediately |
//! | Any other non-2xx | Fail immediately |
//!
//! Delays are the defaults; all of them come from [`FetcherConfig`].

use crate::config::FetcherConfig;
use crate::fetch::outcome::FetchOutcome;
use rand::Rng;
use std::time::Duration;

/// Backoff delays per retryable outcome class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Base wait after a 429
    pub rate_limit_backoff: Duration,
    /// Upper bound of the random extra wait after a 429
    pub rate_limit_jitter: Duration,
    /// Wait after a 503/504 or a reset/timed out connection
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            rate_limit_jitter: Duration::from_millis(config.rate_limit_jitter_ms),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Delay before retrying after `outcome`, or `None` if it must not be retried
    pub fn backoff_for(&self, outcome: &FetchOutcome) -> Option<Duration> {
        match outcome {
            FetchOutcome::RateLimited => Some(self.rate_limit_backoff + self.jitter()),
            FetchOutcome::ServerUnavailable(_) => Some(self.retry_delay),
            FetchOutcome::TransportError { kind, .. } if kind.is_retryable() => {
                Some(self.retry_delay)
            }
            FetchOutcome::TransportError { .. }
            | FetchOutcome::ClientError(_)
            | FetchOutcome::Success(_) => None,
        }
    }

    fn jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.rate_limit_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

/// Remaining retry budget of one logical fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempts_remaining: u32,
    attempts_made: u32,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempts_remaining: max_retries,
            attempts_made: 0,
        }
    }

    /// Records that a physical attempt was issued
    pub fn record_attempt(&mut self) {
        self.attempts_made = self.attempts_made.saturating_add(1);
    }

    /// Spends one retry; returns `false` when the budget is already empty
    pub fn try_consume(&mut self) -> bool {
        if self.attempts_remaining == 0 {
            return false;
        }
        self.attempts_remaining -= 1;
        true
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }
}
