//! Reconnect backoff policy for the durable broker.
//!
//! The delay before retry `n` (zero-based) is
//! `min(retry_backoff * 2^n, retry_max_backoff)`. An unset cap means no
//! cap; a zero base means no delay at all.

use std::time::Duration;

/// Default base delay.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Default delay cap.
pub const DEFAULT_RETRY_MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub retry_backoff: Duration,
    /// `None` disables the cap.
    pub retry_max_backoff: Option<Duration>,
    /// Connect attempts allowed per reconnect. `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Backoff {
    /// Delay to sleep after `attempts` consecutive failures have already
    /// been counted.
    pub fn delay(&self, attempts: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempts);
        let delay = self.retry_backoff.saturating_mul(factor);
        match self.retry_max_backoff {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Whether `attempts` failures exhaust the retry budget.
    pub fn exhausted(&self, attempts: u32) -> bool {
        matches!(self.max_retries, Some(max) if attempts >= max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            retry_max_backoff: Some(DEFAULT_RETRY_MAX_BACKOFF),
            max_retries: None,
        }
    }
}
