// # Command Runner Trait
//
// Backend adapters talk to their platform through its official CLI. The
// runner is the seam between an adapter and the operating system: the
// production implementation spawns a real process, tests substitute canned
// output.

use async_trait::async_trait;

/// Captured result of one CLI invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (-1 when the process was killed by a signal)
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl CommandOutput {
    /// Build a successful output with the given stdout
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Build a failed output with the given exit code and stderr
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command exited with status 0
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Best human-readable reason for a failure
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exit status {}", self.exit_code)
    }
}

/// Trait for running an external program
///
/// Arguments are passed as a vector and never through a shell, so values
/// such as labels are delivered to the program verbatim.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and capture its output
    ///
    /// # Returns
    ///
    /// - `Ok(CommandOutput)`: The process ran (successfully or not)
    /// - `Err(std::io::Error)`: The process could not be spawned at all,
    ///   typically because the program is not installed
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput>;
}
