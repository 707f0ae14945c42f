//! Retry execution engine
//!
//! This module provides the retry loop: it runs an operation up to the
//! policy's attempt limit, waits between attempts according to the backoff
//! sequence, and stops early on success or when the context fires.

use std::fmt::Display;
use std::future::Future;

use tokio::time::Instant;

use crate::backoff::{Backoff, JitterSource, RandomJitter};
use crate::context::Context;
use crate::error::RetryError;
use crate::observer::{NoOpObserver, RetryObserver, TracingObserver};
use crate::policy::{PolicyOption, RetryPolicy};

/// Execute an async operation with the default policy adjusted by `options`
///
/// The operation receives a clone of `ctx` on every attempt so it can observe
/// cancellation itself. Attempts are logged through a [`TracingObserver`].
///
/// # Example
///
/// ```rust,no_run
/// use retryit_core::{retry, with_max_attempts, Context};
///
/// async fn example() {
///     let ctx = Context::new();
///
///     let result = retry(
///         &ctx,
///         |_ctx| async { Ok::<_, std::io::Error>("success") },
///         [with_max_attempts(3)],
///     )
///     .await;
/// }
/// ```
pub async fn retry<F, Fut, T, E, I>(ctx: &Context, op: F, options: I) -> Result<T, RetryError<E>>
where
    F: FnMut(Context) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    I: IntoIterator<Item = PolicyOption>,
{
    RetryExecutorBuilder::new()
        .with_options(options)
        .with_observer(TracingObserver::default())
        .build()
        .execute(ctx, op)
        .await
}

/// Execute an async operation under an already built policy
pub async fn retry_with_policy<F, Fut, T, E>(
    ctx: &Context,
    policy: &RetryPolicy,
    op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(Context) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    RetryExecutorBuilder::new()
        .with_policy(*policy)
        .with_observer(TracingObserver::default())
        .build()
        .execute(ctx, op)
        .await
}

/// Builder for configuring a `RetryExecutor`
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use retryit_core::{
///     with_initial_delay, with_max_attempts, RetryExecutorBuilder, SeededJitter, TracingObserver,
/// };
///
/// let executor = RetryExecutorBuilder::new()
///     .with_options([with_max_attempts(4), with_initial_delay(Duration::from_millis(20))])
///     .with_observer(TracingObserver::new("download"))
///     .with_jitter_source(SeededJitter::new(7))
///     .build();
///
/// assert_eq!(executor.policy().max_attempts, 4);
/// ```
pub struct RetryExecutorBuilder<O = NoOpObserver, J = RandomJitter> {
    policy: RetryPolicy,
    observer: O,
    jitter: J,
}

impl Default for RetryExecutorBuilder<NoOpObserver, RandomJitter> {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutorBuilder<NoOpObserver, RandomJitter> {
    /// Create a new builder with the default policy
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::default(),
            observer: NoOpObserver,
            jitter: RandomJitter,
        }
    }
}

impl<O, J> RetryExecutorBuilder<O, J> {
    /// Replace the policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply overrides, in order, to the current policy
    pub fn with_options<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = PolicyOption>,
    {
        self.policy = self.policy.apply(options);
        self
    }

    /// Set the observer
    ///
    /// The observer receives callbacks during retry execution.
    pub fn with_observer<O2>(self, observer: O2) -> RetryExecutorBuilder<O2, J> {
        RetryExecutorBuilder {
            policy: self.policy,
            observer,
            jitter: self.jitter,
        }
    }

    /// Set the source of random draws used for jitter
    pub fn with_jitter_source<J2>(self, jitter: J2) -> RetryExecutorBuilder<O, J2> {
        RetryExecutorBuilder {
            policy: self.policy,
            observer: self.observer,
            jitter,
        }
    }

    /// Build the executor
    pub fn build(self) -> RetryExecutor<O, J> {
        RetryExecutor {
            policy: self.policy,
            observer: self.observer,
            jitter: self.jitter,
        }
    }
}

/// A retry executor with a fixed policy, observer and jitter source
///
/// Use `RetryExecutorBuilder` to create an instance. An executor holds no
/// per-run state, so one instance may drive any number of concurrent loops.
pub struct RetryExecutor<O, J> {
    policy: RetryPolicy,
    observer: O,
    jitter: J,
}

impl<O, J> RetryExecutor<O, J>
where
    O: RetryObserver,
    J: JitterSource,
{
    /// The policy this executor runs under
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation with retry logic
    ///
    /// # Arguments
    ///
    /// * `ctx` - Cancellation context, forwarded to every attempt and raced
    ///   against every wait
    /// * `op` - A closure that returns a future representing one attempt
    ///
    /// # Returns
    ///
    /// The value of the first successful attempt, or a `RetryError` once
    /// attempts run out, the context fires during a wait, or the policy
    /// permits no attempts.
    pub async fn execute<F, Fut, T, E>(&self, ctx: &Context, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(Context) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.policy.attempt_limit();
        if max_attempts == 0 {
            self.observer.on_no_attempts(self.policy.max_attempts);
            return Err(RetryError::no_attempts(self.policy.max_attempts));
        }

        let start = Instant::now();
        let mut backoff = Backoff::new(&self.policy, &self.jitter);
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.observer.on_attempt_start(attempt, max_attempts);

            let err = match op(ctx.clone()).await {
                Ok(value) => {
                    self.observer.on_success(attempt, start.elapsed());
                    return Ok(value);
                }
                Err(err) => err,
            };

            // No wait after the final attempt
            if attempt >= max_attempts {
                self.observer.on_exhausted(attempt, &err);
                return Err(RetryError::exhausted(attempt, err, start.elapsed()));
            }

            let delay = backoff.next_delay();
            self.observer.on_attempt_failed(attempt, &err, delay);

            tokio::select! {
                biased;
                reason = ctx.done() => {
                    self.observer.on_cancelled(attempt, reason);
                    return Err(RetryError::cancelled(attempt, reason, err));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
