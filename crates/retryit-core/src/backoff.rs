//! Backoff delay computation and jitter sources
//!
//! Every wait goes through the same cap-then-jitter step: clamp to
//! `max_delay`, then add jitter. The first wait starts from `initial_delay`;
//! each later wait first multiplies the previous one by the backoff factor.
//! Jitter is applied after the cap, so a final wait may exceed `max_delay` by
//! up to the jitter fraction. The cap bounds backoff growth, not the
//! randomized wait.

use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::policy::RetryPolicy;

/// Source of uniform samples in `[0, 1)` used to randomize waits
///
/// Implementations must be safe to sample from concurrently.
pub trait JitterSource: Send + Sync {
    /// Draw a value uniformly from `[0, 1)`
    fn sample(&self) -> f64;
}

/// Jitter drawn from the thread-local `rand` generator
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn sample(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Jitter drawn from a seeded generator, reproducible across runs
#[derive(Debug)]
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    /// Create a source that yields the same sequence for the same seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl JitterSource for SeededJitter {
    fn sample(&self) -> f64 {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random::<f64>()
    }
}

/// Jitter that always yields the same sample
///
/// Samples outside `[0, 1)` are clamped into range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&self) -> f64 {
        if self.0.is_nan() {
            return 0.0;
        }
        self.0.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

impl<T: JitterSource + ?Sized> JitterSource for std::sync::Arc<T> {
    fn sample(&self) -> f64 {
        (**self).sample()
    }
}

/// Compute the wait that follows `current`
///
/// # Arguments
///
/// * `current` - The previous wait
/// * `policy` - Supplies the backoff factor, delay cap and jitter fraction
/// * `jitter` - Source of the random draw, consulted only when the policy's
///   jitter fraction is positive
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use retryit_core::{next_delay, with_jitter, with_max_delay, FixedJitter, RetryPolicy};
///
/// let policy = RetryPolicy::with_options([
///     with_jitter(0.0),
///     with_max_delay(Duration::from_millis(300)),
/// ]);
///
/// let delay = next_delay(Duration::from_millis(100), &policy, &FixedJitter(0.0));
/// assert_eq!(delay, Duration::from_millis(200));
///
/// let delay = next_delay(delay, &policy, &FixedJitter(0.0));
/// assert_eq!(delay, Duration::from_millis(300));
/// ```
pub fn next_delay(current: Duration, policy: &RetryPolicy, jitter: &dyn JitterSource) -> Duration {
    cap_and_jitter(scale(current, policy.backoff_factor), policy, jitter)
}

/// Clamp `delay` to the policy's cap, then randomize it upward
pub fn cap_and_jitter(delay: Duration, policy: &RetryPolicy, jitter: &dyn JitterSource) -> Duration {
    let mut delay = delay.min(policy.max_delay);

    if policy.jitter > 0.0 {
        let draw = jitter.sample() * policy.jitter;
        delay = scale(delay, 1.0 + draw);
    }

    delay
}

/// Multiply a duration by a float, saturating instead of panicking
///
/// Negative and NaN products collapse to zero; overflow saturates at the
/// largest nanosecond count a `u64` can hold.
fn scale(delay: Duration, factor: f64) -> Duration {
    let nanos = delay.as_nanos() as f64 * factor;

    if nanos.is_nan() || nanos <= 0.0 {
        Duration::ZERO
    } else if nanos >= u64::MAX as f64 {
        Duration::from_nanos(u64::MAX)
    } else {
        Duration::from_nanos(nanos.round() as u64)
    }
}

/// The sequence of waits for one retry loop
///
/// The first wait is the policy's initial delay passed through
/// [`cap_and_jitter`]. Each later wait is [`next_delay`] of the one before it.
pub struct Backoff<'a> {
    policy: &'a RetryPolicy,
    jitter: &'a dyn JitterSource,
    current: Option<Duration>,
}

impl<'a> Backoff<'a> {
    /// Start a fresh wait sequence
    pub fn new(policy: &'a RetryPolicy, jitter: &'a dyn JitterSource) -> Self {
        Self {
            policy,
            jitter,
            current: None,
        }
    }

    /// The most recently produced wait, if any
    pub fn current(&self) -> Option<Duration> {
        self.current
    }

    /// Produce the next wait and remember it as the current one
    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => cap_and_jitter(self.policy.initial_delay, self.policy, self.jitter),
            Some(current) => next_delay(current, self.policy, self.jitter),
        };
        self.current = Some(delay);
        delay
    }
}

impl Iterator for Backoff<'_> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}
