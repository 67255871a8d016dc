//! Server-side command execution port.

use async_trait::async_trait;
use std::time::Duration;

/// Errors from command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("empty command line")]
    EmptyCommand,

    #[error("failed to spawn command: {0}")]
    Spawn(String),

    #[error("command timed out")]
    Timeout,

    #[error("command exited with {status}: {output}")]
    Failed { status: i32, output: String },
}

/// Port for running pre-tokenized commands with a bounded timeout.
/// Callers pass argv as separate tokens; values substituted into tokens
/// can never break out of their argument boundary.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `argv` and return combined stdout/stderr output.
    async fn run(&self, argv: &[String], timeout: Duration) -> Result<String, CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn command_runner_is_object_safe() {
        fn _accepts_dyn(_runner: &dyn CommandRunner) {}
    }
}
