//! Bounded exponential backoff.
//!
//! The delay after the `n`-th failed attempt (1-based) is
//! `initial_backoff * multiplier * exp_base^(n - 1)`, capped at `max_backoff`.

use std::time::Duration;

/// Configuration for the retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first try.
    pub max_attempts: u32,
    /// Unit the exponential term is scaled by.
    pub initial_backoff: Duration,
    /// Constant factor applied to every delay.
    pub multiplier: f64,
    /// Base of the exponential growth.
    pub exp_base: f64,
    /// Upper bound for a single delay.
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            multiplier: 5.0,
            exp_base: 1.5,
            max_backoff: Duration::from_secs(300),
        }
    }
}

impl RetryConfig {
    /// A policy that never waits between attempts. Handy in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            ..Default::default()
        }
    }
}

/// Stateless retry policy; computes the next delay given the attempt number.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the delay to wait after the `attempt`-th failure (1-based).
    /// Returns `None` once the attempt budget is spent.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if !self.should_retry(attempt) {
            return None;
        }
        let growth = self.config.exp_base.powi(attempt.saturating_sub(1) as i32);
        let secs = self.config.initial_backoff.as_secs_f64() * self.config.multiplier * growth;
        let cap = self.config.max_backoff.as_secs_f64();
        let capped = if secs.is_finite() { secs.clamp(0.0, cap) } else { cap };
        Some(Duration::from_secs_f64(capped))
    }

    /// Returns `true` if another attempt is allowed after `attempt` failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.config.max_attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}
