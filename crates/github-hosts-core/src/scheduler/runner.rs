//! [`CommandRunner`] backed by real processes

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::traits::{CommandOutput, CommandRunner};

/// Runs commands with `tokio::process`, capturing both output streams
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    /// Create a new runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!(program, ?args, "Running command");

        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Other(format!("failed to run {program}: {e}")))?;

        let result = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success {
            tracing::debug!(program, code = ?result.code, "Command exited unsuccessfully");
        }
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_exit_status() {
        let runner = SystemCommandRunner::new();

        let ok = runner.run("true", &[]).await.unwrap();
        assert!(ok.success);

        let failed = runner.run("false", &[]).await.unwrap();
        assert!(!failed.success);
        assert_eq!(failed.code, Some(1));

        assert!(runner.run("/definitely/not/a/program", &[]).await.is_err());
    }
}
