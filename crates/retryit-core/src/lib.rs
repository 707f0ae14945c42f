//! # retryit-core
//!
//! Retry executor for fallible async operations:
//! - Retry policy with defaults and ordered single-field overrides
//! - Exponential backoff with a delay cap and randomized jitter
//! - Cooperative cancellation and deadlines through [`Context`]
//! - Observable retry attempts via the [`RetryObserver`] trait
//! - Policy overrides loaded from YAML files and environment variables
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use retryit_core::{retry, with_initial_delay, with_max_attempts, Context, RetryError};
//!
//! async fn example() -> Result<String, RetryError<std::io::Error>> {
//!     let ctx = Context::new().with_timeout(Duration::from_secs(10));
//!
//!     retry(
//!         &ctx,
//!         |_ctx| async { Ok("success".to_string()) },
//!         [with_max_attempts(3), with_initial_delay(Duration::from_millis(50))],
//!     )
//!     .await
//! }
//! ```

pub mod backoff;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod observer;
pub mod policy;

pub use backoff::{
    cap_and_jitter, next_delay, Backoff, FixedJitter, JitterSource, RandomJitter, SeededJitter,
};
pub use config::PolicyOverrides;
pub use context::{CancelReason, Context};
pub use error::{Error, Result, RetryError};
pub use executor::{retry, retry_with_policy, RetryExecutor, RetryExecutorBuilder};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use policy::{
    with_backoff_factor, with_initial_delay, with_jitter, with_max_attempts, with_max_delay,
    PolicyOption, RetryPolicy,
};
