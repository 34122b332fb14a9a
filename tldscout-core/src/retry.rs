//! Retry budget and exponential backoff for registry lookups.
//!
//! The policy decides what a single registry tier does with a classified
//! failure: retry in place (optionally after a backoff) or move on to the
//! next service tier.

use std::time::Duration;

use rand::Rng;

use crate::error::LookupError;

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts per service tier (including the first).
    pub max_attempts: usize,
    /// Backoff before the first server-error retry.
    pub initial_delay: Duration,
    /// Upper bound on any single backoff.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5000),
            max_delay: Duration::from_millis(30000),
            multiplier: 2.0,
            jitter: false,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Try the same service again, after `backoff` if any.
    Retry { backoff: Option<Duration> },
    /// Give up on this service. `mark_rate_limited` asks for a cooldown.
    NextTier { mark_rate_limited: bool },
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of attempts per tier (at least one).
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Creates a policy that disables retries (single attempt only).
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Calculates the backoff for a given attempt number (0-indexed):
    /// `min(initial * multiplier^attempt, max)`.
    ///
    /// The attempt number is capped to keep `powi` finite.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let safe_attempt = attempt.min(20) as i32;

        let base_delay = self.initial_delay.as_millis() as f64 * self.multiplier.powi(safe_attempt);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // Between 50% and 100% of the delay
            let mut rng = rand::thread_rng();
            capped_delay * rng.gen_range(0.5..1.0)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }

    fn is_last_attempt(&self, attempt: usize) -> bool {
        attempt + 1 >= self.max_attempts
    }

    /// Decides the next step after `error` on 0-indexed `attempt`.
    pub fn disposition(&self, error: &LookupError, attempt: usize) -> Disposition {
        match error {
            LookupError::RateLimited => Disposition::NextTier {
                mark_rate_limited: true,
            },
            LookupError::Forbidden => Disposition::NextTier {
                mark_rate_limited: false,
            },
            LookupError::ServerError(_) if !self.is_last_attempt(attempt) => Disposition::Retry {
                backoff: Some(self.delay_for_attempt(attempt)),
            },
            LookupError::Other(_) if !self.is_last_attempt(attempt) => {
                Disposition::Retry { backoff: None }
            }
            LookupError::ServerError(_) | LookupError::Other(_) => Disposition::NextTier {
                mark_rate_limited: false,
            },
        }
    }
}
