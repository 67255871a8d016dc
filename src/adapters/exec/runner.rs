//! Command runner backed by `tokio::process`.

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

use crate::ports::{CommandError, CommandRunner};

/// Runs pre-tokenized commands with a bounded timeout.
#[derive(Debug, Clone, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, argv: &[String], timeout: Duration) -> Result<String, CommandError> {
        let (program, args) = argv.split_first().ok_or(CommandError::EmptyCommand)?;

        let output = tokio::time::timeout(
            timeout,
            Command::new(program).args(args).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| CommandError::Timeout)?
        .map_err(|err| CommandError::Spawn(err.to_string()))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(CommandError::Failed {
                status: output.status.code().unwrap_or(-1),
                output: combined,
            });
        }
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runner_captures_output() {
        let runner = TokioCommandRunner::new();
        let argv = vec!["echo".to_string(), "hello".to_string()];
        let output = runner.run(&argv, Duration::from_secs(5)).await.unwrap();
        assert_eq!(output.trim(), "hello");
    }

    #[tokio::test]
    async fn test_runner_rejects_empty_argv() {
        let runner = TokioCommandRunner::new();
        assert!(matches!(
            runner.run(&[], Duration::from_secs(1)).await,
            Err(CommandError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn test_runner_reports_nonzero_exit() {
        let runner = TokioCommandRunner::new();
        let argv = vec!["false".to_string()];
        assert!(matches!(
            runner.run(&argv, Duration::from_secs(5)).await,
            Err(CommandError::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_runner_times_out() {
        let runner = TokioCommandRunner::new();
        let argv = vec!["sleep".to_string(), "5".to_string()];
        assert!(matches!(
            runner.run(&argv, Duration::from_millis(50)).await,
            Err(CommandError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_runner_reports_spawn_failure() {
        let runner = TokioCommandRunner::new();
        let argv = vec!["definitely-not-a-binary-9f2c".to_string()];
        assert!(matches!(
            runner.run(&argv, Duration::from_secs(1)).await,
            Err(CommandError::Spawn(_))
        ));
    }
}
