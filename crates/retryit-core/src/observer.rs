//! Retry observation and logging
//!
//! This module provides the `RetryObserver` trait for monitoring retry attempts
//! and a `TracingObserver` implementation that logs using the `tracing` crate.

use std::fmt::Display;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::context::CancelReason;

/// Observer trait for retry loop events
///
/// Implement this trait to receive callbacks during retry execution.
/// This is useful for logging, metrics collection, or debugging.
///
/// # Example
///
/// ```rust
/// use retryit_core::RetryObserver;
/// use std::fmt::Display;
/// use std::time::Duration;
///
/// struct MetricsObserver;
///
/// impl RetryObserver for MetricsObserver {
///     fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {}
///
///     fn on_attempt_failed(&self, attempt: u32, error: &dyn Display, delay: Duration) {}
///
///     fn on_success(&self, attempt: u32, total_duration: Duration) {}
///
///     fn on_exhausted(&self, attempts: u32, final_error: &dyn Display) {}
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// Called when an attempt is about to start
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number (1-indexed)
    /// * `max_attempts` - The attempt limit of the policy
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32);

    /// Called when an attempt fails and a wait before the next one begins
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number that failed (1-indexed)
    /// * `error` - The error that caused the failure
    /// * `delay` - The wait before the next attempt
    fn on_attempt_failed(&self, attempt: u32, error: &dyn Display, delay: Duration);

    /// Called when the operation succeeds
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number that succeeded (1-indexed)
    /// * `total_duration` - Total time spent across all attempts
    fn on_success(&self, attempt: u32, total_duration: Duration);

    /// Called when all attempts are exhausted
    ///
    /// # Arguments
    ///
    /// * `attempts` - Total number of attempts made
    /// * `final_error` - The error from the final attempt
    fn on_exhausted(&self, attempts: u32, final_error: &dyn Display);

    /// Called when the context fires during a wait between attempts
    fn on_cancelled(&self, attempt: u32, reason: CancelReason) {
        let _ = (attempt, reason);
    }

    /// Called when the policy permits no attempts at all
    fn on_no_attempts(&self, max_attempts: i32) {
        let _ = max_attempts;
    }
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: u32) {}

    fn on_attempt_failed(&self, _attempt: u32, _error: &dyn Display, _delay: Duration) {}

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {}

    fn on_exhausted(&self, _attempts: u32, _final_error: &dyn Display) {}
}

/// An observer that logs retry events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_attempt_start`: DEBUG
/// - `on_attempt_failed`: WARN
/// - `on_success`: INFO (if > 1 attempt) or DEBUG (first attempt)
/// - `on_exhausted`: ERROR
/// - `on_cancelled`: WARN
/// - `on_no_attempts`: WARN
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the operation being retried (for log context)
    operation: String,
}

impl TracingObserver {
    /// Create a new tracing observer
    ///
    /// # Arguments
    ///
    /// * `operation` - A descriptive name for the operation being retried
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Get the operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        tracing::debug!(
            operation = %self.operation,
            attempt = attempt,
            max_attempts = max_attempts,
            "starting attempt"
        );
    }

    fn on_attempt_failed(&self, attempt: u32, error: &dyn Display, delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, will retry"
        );
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        if attempt > 1 {
            tracing::info!(
                operation = %self.operation,
                attempt = attempt,
                total_duration_ms = total_duration.as_millis() as u64,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                duration_ms = total_duration.as_millis() as u64,
                "succeeded on first attempt"
            );
        }
    }

    fn on_exhausted(&self, attempts: u32, final_error: &dyn Display) {
        tracing::error!(
            operation = %self.operation,
            attempts = attempts,
            error = %final_error,
            "all retry attempts exhausted"
        );
    }

    fn on_cancelled(&self, attempt: u32, reason: CancelReason) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            reason = %reason,
            "retry cancelled while waiting"
        );
    }

    fn on_no_attempts(&self, max_attempts: i32) {
        tracing::warn!(
            operation = %self.operation,
            max_attempts = max_attempts,
            "policy permits no attempts, operation not run"
        );
    }
}

/// An observer that counts retry events
///
/// Useful for testing and metrics collection.
#[derive(Debug, Default)]
pub struct StatsObserver {
    /// Attempt start events
    pub attempt_starts: AtomicU32,
    /// Failed attempt events
    pub failures: AtomicU32,
    /// Success events
    pub successes: AtomicU32,
    /// Exhaustion events
    pub exhaustions: AtomicU32,
    /// Cancellation events
    pub cancellations: AtomicU32,
    /// No-attempt events
    pub no_attempts: AtomicU32,
}

impl StatsObserver {
    /// Create a new stats observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of attempt starts
    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts.load(Ordering::SeqCst)
    }

    /// Get the number of failures followed by a wait
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Get the number of successes
    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    /// Get the number of exhaustions
    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(Ordering::SeqCst)
    }

    /// Get the number of cancellations
    pub fn cancellations(&self) -> u32 {
        self.cancellations.load(Ordering::SeqCst)
    }

    /// Get the number of runs refused by the policy
    pub fn no_attempts(&self) -> u32 {
        self.no_attempts.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: u32) {
        self.attempt_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_attempt_failed(&self, _attempt: u32, _error: &dyn Display, _delay: Duration) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_exhausted(&self, _attempts: u32, _final_error: &dyn Display) {
        self.exhaustions.fetch_add(1, Ordering::SeqCst);
    }

    fn on_cancelled(&self, _attempt: u32, _reason: CancelReason) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
    }

    fn on_no_attempts(&self, _max_attempts: i32) {
        self.no_attempts.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for std::sync::Arc<T> {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        (**self).on_attempt_start(attempt, max_attempts)
    }

    fn on_attempt_failed(&self, attempt: u32, error: &dyn Display, delay: Duration) {
        (**self).on_attempt_failed(attempt, error, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, final_error: &dyn Display) {
        (**self).on_exhausted(attempts, final_error)
    }

    fn on_cancelled(&self, attempt: u32, reason: CancelReason) {
        (**self).on_cancelled(attempt, reason)
    }

    fn on_no_attempts(&self, max_attempts: i32) {
        (**self).on_no_attempts(max_attempts)
    }
}
