//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser};
use retryit_core::PolicyOverrides;

/// retryit - Run a command until it succeeds
#[derive(Parser, Debug)]
#[command(name = "retryit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to a YAML file with policy overrides
    #[arg(short, long, env = "RETRYIT_CONFIG")]
    pub config: Option<Utf8PathBuf>,

    #[command(flatten)]
    pub policy: PolicyArgs,

    /// Give up once this many seconds have passed since start
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Program to run, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Retry policy flags; each one overrides the config file and environment
#[derive(Args, Debug, Default)]
pub struct PolicyArgs {
    /// Total number of attempts, the first run included
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    pub max_attempts: Option<i32>,

    /// Wait before the second attempt, in milliseconds
    #[arg(long)]
    pub initial_delay_ms: Option<u64>,

    /// Ceiling for the backoff wait, in milliseconds
    #[arg(long)]
    pub max_delay_ms: Option<u64>,

    /// Multiplier applied to the wait after each failure
    #[arg(long, allow_negative_numbers = true)]
    pub backoff_factor: Option<f64>,

    /// Random extra wait as a fraction of the capped wait
    #[arg(long, allow_negative_numbers = true)]
    pub jitter: Option<f64>,
}

impl PolicyArgs {
    /// The flags that were given, as a configuration layer
    pub fn to_overrides(&self) -> PolicyOverrides {
        PolicyOverrides {
            max_attempts: self.max_attempts,
            initial_delay_ms: self.initial_delay_ms,
            max_delay_ms: self.max_delay_ms,
            backoff_factor: self.backoff_factor,
            jitter: self.jitter,
        }
    }
}
