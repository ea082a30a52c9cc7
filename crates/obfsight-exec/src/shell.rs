//! Shell command execution with captured output.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use obfsight_core::{CommandOutput, CommandRunner, PipelineError, Result};

/// Runs command lines through `sh -c` in a working directory.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: String,
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different POSIX shell, e.g. `bash`.
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput> {
        if command.trim().is_empty() {
            return Err(PipelineError::Command("empty command".to_string()));
        }

        debug!(command = %command, cwd = %cwd.display(), "Spawning shell command");
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PipelineError::Command(format!("failed to start `{command}` in {}: {e}", cwd.display()))
            })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PipelineError::Command(format!("failed to wait for `{command}`: {e}")))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
