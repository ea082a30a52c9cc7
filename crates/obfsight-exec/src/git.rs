//! Repository download through the `git` executable.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

use obfsight_core::{PipelineError, Result, SourceFetcher};

/// Clones with `git clone <remote> <dest>`.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: String,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(&self, remote: &str, dest: &Path) -> Result<()> {
        info!(remote = %remote, dest = %dest.display(), "git clone");
        let output = Command::new(&self.program)
            .arg("clone")
            .arg("--quiet")
            .arg(remote)
            .arg(dest)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| PipelineError::Fetch(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Fetch(format!(
                "git clone {remote} failed: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn run_git(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    #[tokio::test]
    async fn test_clone_local_repository() {
        let upstream = tempfile::tempdir().unwrap();
        run_git(upstream.path(), &["init", "--quiet"]);
        run_git(upstream.path(), &["config", "user.name", "test-user"]);
        run_git(upstream.path(), &["config", "user.email", "test@example.com"]);
        std::fs::write(upstream.path().join("package.json"), "{}").unwrap();
        run_git(upstream.path(), &["add", "."]);
        run_git(upstream.path(), &["commit", "--quiet", "-m", "initial"]);

        let target = tempfile::tempdir().unwrap();
        let dest = target.path().join("original");
        std::fs::create_dir_all(&dest).unwrap();

        GitFetcher::new()
            .fetch(upstream.path().to_str().unwrap(), &dest)
            .await
            .expect("clone failed");
        assert!(dest.join("package.json").is_file());
    }

    #[tokio::test]
    async fn test_clone_bad_remote_is_fetch_error() {
        let target = tempfile::tempdir().unwrap();
        let missing = target.path().join("no-such-repo");
        let err = GitFetcher::new()
            .fetch(missing.to_str().unwrap(), &target.path().join("dest"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(_)));
    }
}
