//! retryit - run a command until it succeeds
//!
//! The retry policy comes from built-in defaults, an optional YAML file,
//! `RETRYIT_*` environment variables and command-line flags, in increasing
//! precedence.

mod cli;
mod command;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use retryit_core::{
    CancelReason, Context, PolicyOverrides, RetryError, RetryExecutorBuilder, TracingObserver,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use command::{run_command, CommandError};

/// Exit code when the deadline passes
const EXIT_TIMEOUT: u8 = 124;
/// Exit code when interrupted by Ctrl-C
const EXIT_CANCELLED: u8 = 130;
/// Exit code when the policy permits no attempts
const EXIT_NO_ATTEMPTS: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let overrides = load_overrides(&cli)?;
    let policy = overrides.to_policy();
    tracing::debug!(?policy, "resolved retry policy");

    let root = Context::new();
    let ctx = match cli.timeout_secs {
        Some(secs) => root.with_timeout(Duration::from_secs(secs)),
        None => root.child(),
    };

    let interrupt = root.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping");
            interrupt.cancel();
        }
    });

    let operation = cli.command.join(" ");
    let executor = RetryExecutorBuilder::new()
        .with_policy(policy)
        .with_observer(TracingObserver::new(operation))
        .build();

    let argv = cli.command;
    let result = executor
        .execute(&ctx, |attempt_ctx| run_command(attempt_ctx, &argv))
        .await;

    Ok(exit_code(result))
}

/// Merge config file, environment and flag overrides (low to high)
fn load_overrides(cli: &Cli) -> Result<PolicyOverrides> {
    let file = match &cli.config {
        Some(path) => PolicyOverrides::from_file(path)
            .with_context(|| format!("loading retry policy from {}", path))?,
        None => PolicyOverrides::default(),
    };

    let env = PolicyOverrides::from_env().context("reading RETRYIT_* environment")?;

    Ok(file.merge(env).merge(cli.policy.to_overrides()))
}

/// Map the terminal outcome to a process exit code
fn exit_code(result: std::result::Result<(), RetryError<CommandError>>) -> ExitCode {
    let err = match result {
        Ok(()) => return ExitCode::SUCCESS,
        Err(err) => err,
    };

    if !matches!(err, RetryError::Exhausted { .. }) {
        eprintln!("retryit: {}", err);
    }

    match err {
        // The deadline can also land while the final attempt is running
        RetryError::Exhausted {
            source: CommandError::Interrupted { reason, .. },
            ..
        } => cancel_exit_code(reason),
        RetryError::Exhausted { source, .. } => {
            let code = source.exit_code().and_then(|c| u8::try_from(c).ok());
            ExitCode::from(code.filter(|c| *c != 0).unwrap_or(1))
        }
        RetryError::Cancelled { reason, .. } => cancel_exit_code(reason),
        RetryError::NoAttempts { .. } => ExitCode::from(EXIT_NO_ATTEMPTS),
    }
}

fn cancel_exit_code(reason: CancelReason) -> ExitCode {
    match reason {
        CancelReason::DeadlineExceeded => ExitCode::from(EXIT_TIMEOUT),
        CancelReason::Cancelled => ExitCode::from(EXIT_CANCELLED),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            _ => EnvFilter::new("debug"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
