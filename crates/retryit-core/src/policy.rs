//! Retry policy and its override options
//!
//! A [`RetryPolicy`] starts from fixed defaults and is adjusted by an ordered
//! list of [`PolicyOption`]s, each of which sets exactly one field. Options are
//! applied left to right, so a later option for the same field wins.

use std::time::Duration;

/// Parameters governing one retry loop
///
/// No cross-field validation is performed. Nonsensical values (a negative
/// backoff factor, a `max_attempts` of zero) surface only as behavior during
/// execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total number of invocations allowed, the first call included.
    /// Zero or negative means the operation never runs.
    pub max_attempts: i32,

    /// Wait before the second attempt
    pub initial_delay: Duration,

    /// Ceiling applied to every computed wait before jitter
    pub max_delay: Duration,

    /// Multiplier applied to the previous wait each time a wait is recomputed
    pub backoff_factor: f64,

    /// Fraction of the capped wait added as random extra wait
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_factor: default_backoff_factor(),
            jitter: default_jitter(),
        }
    }
}

fn default_max_attempts() -> i32 {
    5
}
fn default_initial_delay() -> Duration {
    Duration::from_millis(100)
}
fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}
fn default_backoff_factor() -> f64 {
    2.0
}
fn default_jitter() -> f64 {
    0.1
}

impl RetryPolicy {
    /// Build a policy from the defaults and an ordered list of overrides
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use retryit_core::{with_max_attempts, with_jitter, RetryPolicy};
    ///
    /// let policy = RetryPolicy::with_options([with_max_attempts(3), with_jitter(0.0)]);
    /// assert_eq!(policy.max_attempts, 3);
    /// assert_eq!(policy.initial_delay, Duration::from_millis(100));
    /// ```
    pub fn with_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = PolicyOption>,
    {
        Self::default().apply(options)
    }

    /// Apply overrides on top of this policy, returning the result
    pub fn apply<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = PolicyOption>,
    {
        for option in options {
            option.apply_to(&mut self);
        }
        self
    }

    /// Number of invocations this policy permits, zero for non-positive limits
    pub fn attempt_limit(&self) -> u32 {
        u32::try_from(self.max_attempts).unwrap_or(0)
    }
}

impl FromIterator<PolicyOption> for RetryPolicy {
    fn from_iter<I: IntoIterator<Item = PolicyOption>>(iter: I) -> Self {
        Self::with_options(iter)
    }
}

/// A single-field override for [`RetryPolicy`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicyOption {
    /// Total number of invocations allowed
    MaxAttempts(i32),
    /// Wait before the second attempt
    InitialDelay(Duration),
    /// Ceiling for computed waits
    MaxDelay(Duration),
    /// Growth multiplier between waits
    BackoffFactor(f64),
    /// Random extra wait as a fraction of the capped wait
    Jitter(f64),
}

impl PolicyOption {
    /// Set the field this option names
    pub fn apply_to(self, policy: &mut RetryPolicy) {
        match self {
            PolicyOption::MaxAttempts(attempts) => policy.max_attempts = attempts,
            PolicyOption::InitialDelay(delay) => policy.initial_delay = delay,
            PolicyOption::MaxDelay(delay) => policy.max_delay = delay,
            PolicyOption::BackoffFactor(factor) => policy.backoff_factor = factor,
            PolicyOption::Jitter(jitter) => policy.jitter = jitter,
        }
    }
}

/// Override the total number of attempts
pub fn with_max_attempts(attempts: i32) -> PolicyOption {
    PolicyOption::MaxAttempts(attempts)
}

/// Override the wait before the second attempt
pub fn with_initial_delay(delay: Duration) -> PolicyOption {
    PolicyOption::InitialDelay(delay)
}

/// Override the ceiling for computed waits
pub fn with_max_delay(delay: Duration) -> PolicyOption {
    PolicyOption::MaxDelay(delay)
}

/// Override the backoff multiplier
pub fn with_backoff_factor(factor: f64) -> PolicyOption {
    PolicyOption::BackoffFactor(factor)
}

/// Override the jitter fraction
pub fn with_jitter(jitter: f64) -> PolicyOption {
    PolicyOption::Jitter(jitter)
}
