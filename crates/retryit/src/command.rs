//! Running the retried command as a child process

use std::io;
use std::process::ExitStatus;

use retryit_core::{CancelReason, Context};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Why one run of the command failed
#[derive(Error, Debug)]
pub enum CommandError {
    /// Empty argument list
    #[error("no command given")]
    Empty,

    /// The program could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Waiting on the child failed
    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The program ran and reported failure
    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },

    /// The context fired while the program was running; it was killed
    #[error("{program} killed: {reason}")]
    Interrupted {
        program: String,
        reason: CancelReason,
    },
}

impl CommandError {
    /// Exit code of the failed run, when the program produced one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::Failed { status, .. } => status.code(),
            _ => None,
        }
    }
}

/// Run `argv` once, killing it if `ctx` fires first
pub async fn run_command(ctx: Context, argv: &[String]) -> Result<(), CommandError> {
    let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;

    debug!(program = %program, args = ?args, "spawning command");

    let mut child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;

    tokio::select! {
        status = child.wait() => {
            let status = status.map_err(|source| CommandError::Wait {
                program: program.clone(),
                source,
            })?;
            if status.success() {
                Ok(())
            } else {
                Err(CommandError::Failed {
                    program: program.clone(),
                    status,
                })
            }
        }
        reason = ctx.done() => {
            if let Err(e) = child.kill().await {
                debug!(program = %program, error = %e, "kill after cancellation failed");
            }
            Err(CommandError::Interrupted {
                program: program.clone(),
                reason,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_successful_command() {
        let result = run_command(Context::new(), &argv(&["true"])).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failing_command_reports_exit_code() {
        let err = run_command(Context::new(), &argv(&["sh", "-c", "exit 3"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Failed { .. }));
        assert_eq!(err.exit_code(), Some(3));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run_command(Context::new(), &argv(&["retryit-no-such-program"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
        assert_eq!(err.exit_code(), None);
    }

    #[tokio::test]
    async fn test_empty_argv() {
        let err = run_command(Context::new(), &[]).await.unwrap_err();
        assert!(matches!(err, CommandError::Empty));
    }

    #[tokio::test]
    async fn test_deadline_kills_command() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));
        let err = run_command(ctx, &argv(&["sleep", "10"])).await.unwrap_err();
        assert!(matches!(
            err,
            CommandError::Interrupted {
                reason: CancelReason::DeadlineExceeded,
                ..
            }
        ));
    }
}
