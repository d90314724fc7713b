//! Fixed-delay retry budget.
//!
//! A [`RetryPolicy`] is a plain value (attempts, delay) so callers can thread
//! it through a state machine and tests can inject a zero-delay policy. Each
//! run draws a fresh [`RetryBudget`] from the policy; every failure, whatever
//! phase it came from, is charged to that single budget.

use std::time::Duration;

use crate::Retryable;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom max attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Create a new retry config with a custom delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Create a new retry config that retries without waiting.
    #[must_use]
    pub const fn immediate(self) -> Self {
        self.with_delay(Duration::ZERO)
    }
}

/// Retry policy handing out per-run budgets.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Start a new budget for one run.
    #[must_use]
    pub const fn budget(&self) -> RetryBudget {
        RetryBudget {
            attempts_remaining: self.config.max_attempts,
            attempts_made: 0,
            delay: self.config.delay,
        }
    }

    /// Get the maximum number of attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Get the delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.config.delay
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for the delay, then try again
    RetryAfter(Duration),
    /// The budget is spent
    Exhausted,
    /// The error is not retryable
    Fatal,
}

/// Attempts remaining plus the fixed delay, scoped to one run.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    attempts_remaining: u32,
    attempts_made: u32,
    delay: Duration,
}

impl RetryBudget {
    /// Charge a failed attempt to the budget.
    ///
    /// Non-retryable errors end the run without touching the remaining
    /// attempts.
    pub fn record_failure<E: Retryable + ?Sized>(&mut self, error: &E) -> RetryDecision {
        self.attempts_made += 1;
        if !error.is_retryable() {
            return RetryDecision::Fatal;
        }
        self.attempts_remaining = self.attempts_remaining.saturating_sub(1);
        if self.attempts_remaining == 0 {
            RetryDecision::Exhausted
        } else {
            RetryDecision::RetryAfter(self.delay)
        }
    }

    /// Sleep for the fixed delay.
    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Attempts still available.
    #[must_use]
    pub const fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    /// Attempts that have failed so far.
    #[must_use]
    pub const fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// The fixed delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}
