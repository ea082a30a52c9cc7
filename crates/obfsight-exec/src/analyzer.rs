//! Complexity analysis through an external command.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use obfsight_core::{ComplexityAnalyzer, FileMetrics, PipelineError, Result};

/// Runs `<command> <dir>` and parses a JSON array of [`FileMetrics`] from
/// stdout.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    command: String,
}

impl CommandAnalyzer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl ComplexityAnalyzer for CommandAnalyzer {
    async fn analyze(&self, dir: &Path) -> Result<Vec<FileMetrics>> {
        if self.command.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "no complexity command configured".to_string(),
            ));
        }

        // The directory is passed as a positional parameter, never spliced
        // into the script text.
        let script = format!("{} \"$1\"", self.command);
        debug!(command = %self.command, dir = %dir.display(), "Running complexity analyzer");
        let output = Command::new("sh")
            .arg("-c")
            .arg(&script)
            .arg("obfsight-analyzer")
            .arg(dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| PipelineError::Analyzer(format!("failed to start `{}`: {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Analyzer(format!(
                "`{}` exited with {}: {}",
                self.command,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| PipelineError::Analyzer(format!("unreadable analyzer output: {e}")))
    }
}
