//! Process-backed [`CommandRunner`]

use crate::traits::{CommandOutput, CommandRunner};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Runs programs as child processes via `tokio::process`
///
/// No timeout is imposed; a hung CLI hangs the run, matching how the
/// platform CLIs are normally used interactively.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        tracing::debug!(program = %program, args = ?args, "Running command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let exit_code = output.status.code().unwrap_or(-1);
        let result = CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };

        if result.is_success() {
            tracing::trace!(program = %program, "Command succeeded");
        } else {
            tracing::debug!(
                program = %program,
                exit_code = exit_code,
                stderr = %result.stderr,
                "Command failed"
            );
        }

        Ok(result)
    }
}
