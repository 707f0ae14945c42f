//! Policy overrides loaded from configuration sources
//!
//! Overrides are layered with the following precedence (low to high):
//! 1. Built-in policy defaults
//! 2. YAML configuration file
//! 3. Environment variables (`RETRYIT_*` prefix)
//! 4. CLI flags (handled by caller)
//!
//! Each layer is a [`PolicyOverrides`]; layers are merged and then turned into
//! the ordered option list applied over [`RetryPolicy::default`].
//!
//! [`RetryPolicy::default`]: crate::RetryPolicy

use std::env;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use camino::Utf8Path;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::policy::{
    with_backoff_factor, with_initial_delay, with_jitter, with_max_attempts, with_max_delay,
    PolicyOption, RetryPolicy,
};

/// Environment variable overriding the attempt limit
pub const ENV_MAX_ATTEMPTS: &str = "RETRYIT_MAX_ATTEMPTS";
/// Environment variable overriding the initial delay, in milliseconds
pub const ENV_INITIAL_DELAY_MS: &str = "RETRYIT_INITIAL_DELAY_MS";
/// Environment variable overriding the delay cap, in milliseconds
pub const ENV_MAX_DELAY_MS: &str = "RETRYIT_MAX_DELAY_MS";
/// Environment variable overriding the backoff factor
pub const ENV_BACKOFF_FACTOR: &str = "RETRYIT_BACKOFF_FACTOR";
/// Environment variable overriding the jitter fraction
pub const ENV_JITTER: &str = "RETRYIT_JITTER";

/// A partial policy: every field that is set overrides the layer below it
///
/// ```yaml
/// max-attempts: 4
/// initial-delay-ms: 250
/// max-delay-ms: 10000
/// backoff-factor: 1.5
/// jitter: 0.2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PolicyOverrides {
    /// Total number of attempts
    #[serde(default)]
    pub max_attempts: Option<i32>,

    /// Wait before the second attempt, in milliseconds
    #[serde(default)]
    pub initial_delay_ms: Option<u64>,

    /// Ceiling for computed waits, in milliseconds
    #[serde(default)]
    pub max_delay_ms: Option<u64>,

    /// Growth multiplier between waits
    #[serde(default)]
    pub backoff_factor: Option<f64>,

    /// Random extra wait as a fraction of the capped wait
    #[serde(default)]
    pub jitter: Option<f64>,
}

impl PolicyOverrides {
    /// Parse overrides from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document is a file with no overrides
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Load overrides from a YAML file
    pub fn from_file(path: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::config_not_found(path.as_str()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Load overrides from `RETRYIT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            max_attempts: env_value(ENV_MAX_ATTEMPTS)?,
            initial_delay_ms: env_value(ENV_INITIAL_DELAY_MS)?,
            max_delay_ms: env_value(ENV_MAX_DELAY_MS)?,
            backoff_factor: env_value(ENV_BACKOFF_FACTOR)?,
            jitter: env_value(ENV_JITTER)?,
        })
    }

    /// Layer `overlay` on top of `self`; fields set in the overlay win
    pub fn merge(self, overlay: PolicyOverrides) -> PolicyOverrides {
        PolicyOverrides {
            max_attempts: overlay.max_attempts.or(self.max_attempts),
            initial_delay_ms: overlay.initial_delay_ms.or(self.initial_delay_ms),
            max_delay_ms: overlay.max_delay_ms.or(self.max_delay_ms),
            backoff_factor: overlay.backoff_factor.or(self.backoff_factor),
            jitter: overlay.jitter.or(self.jitter),
        }
    }

    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The set fields as an ordered list of policy options
    pub fn to_options(&self) -> Vec<PolicyOption> {
        let mut options = Vec::new();

        if let Some(attempts) = self.max_attempts {
            options.push(with_max_attempts(attempts));
        }
        if let Some(ms) = self.initial_delay_ms {
            options.push(with_initial_delay(Duration::from_millis(ms)));
        }
        if let Some(ms) = self.max_delay_ms {
            options.push(with_max_delay(Duration::from_millis(ms)));
        }
        if let Some(factor) = self.backoff_factor {
            options.push(with_backoff_factor(factor));
        }
        if let Some(jitter) = self.jitter {
            options.push(with_jitter(jitter));
        }

        options
    }

    /// Apply these overrides over the default policy
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::with_options(self.to_options())
    }
}

/// Read and parse an optional environment variable
fn env_value<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::invalid_config(format!("{} must be a valid number", name))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(Error::invalid_config(format!(
            "{} is not valid UTF-8",
            name
        ))),
    }
}
