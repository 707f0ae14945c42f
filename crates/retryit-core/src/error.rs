//! Error types for retryit-core
//!
//! [`RetryError`] is the terminal failure of a retry loop. [`Error`] covers
//! loading policy overrides from files and the environment.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::context::CancelReason;

/// Result type alias using retryit-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Terminal failure of a retry loop
///
/// The error type is generic over `E`, the error returned by the operation
/// being retried. Intermediate failures never escape the loop; only the last
/// one is carried here.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every permitted attempt failed
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// The error from the final attempt
        source: E,
        /// Time spent across all attempts and waits
        total_duration: Duration,
    },

    /// The context fired while waiting between attempts
    Cancelled {
        /// Number of attempts made before cancellation
        attempts: u32,
        /// Why the context fired
        reason: CancelReason,
        /// The error from the attempt preceding the interrupted wait
        last_error: E,
    },

    /// The policy permitted no attempts, so the operation never ran
    NoAttempts {
        /// The configured attempt limit
        max_attempts: i32,
    },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { source, .. } => {
                write!(f, "max retry attempts reached: {}", source)
            }
            RetryError::Cancelled { reason, .. } => write!(f, "{}", reason),
            RetryError::NoAttempts { max_attempts } => {
                write!(f, "no attempts made: max attempts is {}", max_attempts)
            }
        }
    }
}

impl<E: StdError + 'static> StdError for RetryError<E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            RetryError::Exhausted { source, .. } => Some(source),
            RetryError::Cancelled { reason, .. } => Some(reason),
            RetryError::NoAttempts { .. } => None,
        }
    }
}

impl<E> RetryError<E> {
    /// Create a new exhausted error
    pub fn exhausted(attempts: u32, source: E, total_duration: Duration) -> Self {
        RetryError::Exhausted {
            attempts,
            source,
            total_duration,
        }
    }

    /// Create a new cancelled error
    pub fn cancelled(attempts: u32, reason: CancelReason, last_error: E) -> Self {
        RetryError::Cancelled {
            attempts,
            reason,
            last_error,
        }
    }

    /// Create a new no-attempts error
    pub fn no_attempts(max_attempts: i32) -> Self {
        RetryError::NoAttempts { max_attempts }
    }

    /// Get the number of attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Cancelled { attempts, .. } => *attempts,
            RetryError::NoAttempts { .. } => 0,
        }
    }

    /// Check if this error indicates all attempts were exhausted
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// Check if this error indicates cancellation or a deadline
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// Check if the policy permitted no attempts
    pub fn is_no_attempts(&self) -> bool {
        matches!(self, RetryError::NoAttempts { .. })
    }

    /// Why the context fired, for cancelled errors
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            RetryError::Cancelled { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Get the last operation error, consuming this error
    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::Exhausted { source, .. } => Some(source),
            RetryError::Cancelled { last_error, .. } => Some(last_error),
            RetryError::NoAttempts { .. } => None,
        }
    }

    /// Get a reference to the last operation error
    pub fn source_ref(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { source, .. } => Some(source),
            RetryError::Cancelled { last_error, .. } => Some(last_error),
            RetryError::NoAttempts { .. } => None,
        }
    }

    /// Map the operation error type using a closure
    pub fn map_err<F, E2>(self, f: F) -> RetryError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            RetryError::Exhausted {
                attempts,
                source,
                total_duration,
            } => RetryError::Exhausted {
                attempts,
                source: f(source),
                total_duration,
            },
            RetryError::Cancelled {
                attempts,
                reason,
                last_error,
            } => RetryError::Cancelled {
                attempts,
                reason,
                last_error: f(last_error),
            },
            RetryError::NoAttempts { max_attempts } => RetryError::NoAttempts { max_attempts },
        }
    }
}
