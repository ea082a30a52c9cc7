//! File transforms delegated to an external filter command.
//!
//! The command reads one source file on stdin and writes the transformed file
//! on stdout. Profile options are passed as a JSON object in
//! [`OPTIONS_ENV`].

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use obfsight_core::{FileTransform, PipelineError, Result};

/// Environment variable carrying the profile options.
pub const OPTIONS_ENV: &str = "OBFSIGHT_TRANSFORM_OPTIONS";

/// Pipes each file through `sh -c <command>`.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    /// Used in error messages ("obfuscate", "deobfuscate").
    label: String,
    command: String,
}

impl CommandTransform {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn failure(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::Transform {
            path: PathBuf::new(),
            message: format!("{}: {}", self.label, message.into()),
        }
    }
}

#[async_trait]
impl FileTransform for CommandTransform {
    async fn transform(&self, source: &str, options: &Map<String, Value>) -> Result<String> {
        if self.command.trim().is_empty() {
            return Err(PipelineError::Configuration(format!(
                "no {} command configured",
                self.label
            )));
        }

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env(OPTIONS_ENV, serde_json::to_string(options)?)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failure(format!("failed to start `{}`: {e}", self.command)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.failure("stdin not captured"))?;
        let input = source.as_bytes();
        let feed = async move {
            let written = stdin.write_all(input).await;
            drop(stdin);
            written
        };

        // Feed stdin while draining stdout so large files cannot deadlock.
        let (written, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| self.failure(format!("failed to wait: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!(
                "exit status {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        // A filter may exit early without reading everything; only its
        // exit status matters then.
        if let Err(e) = written {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(self.failure(format!("failed to write stdin: {e}")));
            }
        }

        String::from_utf8(output.stdout).map_err(|e| self.failure(format!("output is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_filter_rewrites_source() {
        let transform = CommandTransform::new("obfuscate", "tr a-z A-Z");
        let out = transform
            .transform("var x = 1;\n", &Map::new())
            .await
            .unwrap();
        assert_eq!(out, "VAR X = 1;\n");
    }

    #[tokio::test]
    async fn test_options_reach_the_command() {
        let transform = CommandTransform::new("obfuscate", "printf '%s' \"$OBFSIGHT_TRANSFORM_OPTIONS\"");
        let mut options = Map::new();
        options.insert("compact".to_string(), json!(true));
        let out = transform.transform("ignored", &options).await.unwrap();
        assert_eq!(out, r#"{"compact":true}"#);
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_transform_error() {
        let transform = CommandTransform::new("deobfuscate", "echo 'unexpected token' >&2; exit 1");
        let err = transform.transform("x", &Map::new()).await.unwrap_err();
        match err {
            PipelineError::Transform { message, .. } => {
                assert!(message.contains("deobfuscate"));
                assert!(message.contains("unexpected token"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_command_is_configuration_error() {
        let transform = CommandTransform::new("obfuscate", "");
        let err = transform.transform("x", &Map::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
