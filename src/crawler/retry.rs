//! Backoff schedule for page fetch retries

use crate::config::CrawlerConfig;
use rand::Rng;
use std::time::Duration;

/// Retry schedule applied to every page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before giving up; `None` never gives up
    pub max_attempts: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: if config.retry_forever {
                None
            } else {
                config.max_attempts
            },
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    /// Whether another attempt may follow `attempts` failed ones
    pub fn allows_another(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts < max,
            None => true,
        }
    }

    /// Backoff before retrying after failed attempt number `attempt` (1-based)
    ///
    /// `base * 2^(attempt - 1)`, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);

        2u32.checked_pow(exponent)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map(|delay| delay.min(self.max_delay))
            .unwrap_or(self.max_delay)
    }

    /// [`backoff`](Self::backoff) plus up to half of it again as random jitter
    pub fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        let spread = (backoff.as_millis() / 2) as u64;
        if spread == 0 {
            return backoff;
        }

        backoff + Duration::from_millis(rand::rng().random_range(0..=spread))
    }
}
