//! Collaborator contracts.
//!
//! The pipeline decides *when* to fetch, transform, analyze and run tests;
//! implementations of these traits decide *how*. Subprocess-backed
//! implementations live in `obfsight-exec`, in-memory ones in [`crate::fakes`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

use crate::complexity::FileMetrics;
use crate::domain::{Result, Stage};

/// Clones a remote repository into a directory the caller has created.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, remote: &str, dest: &Path) -> Result<()>;
}

/// Captured output of a shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,

    /// Exit code, `-1` when the process was killed by a signal.
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs shell command lines.
///
/// A non-zero exit is returned as data; `Err` is reserved for failing to
/// start the command at all.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput>;
}

/// Rewrites a single source file.
#[async_trait]
pub trait FileTransform: Send + Sync {
    async fn transform(&self, source: &str, options: &Map<String, Value>) -> Result<String>;
}

/// Computes per-file metrics for every source file under a directory.
#[async_trait]
pub trait ComplexityAnalyzer: Send + Sync {
    async fn analyze(&self, dir: &Path) -> Result<Vec<FileMetrics>>;
}

/// The full set of collaborators a pipeline needs.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn SourceFetcher>,
    pub commands: Arc<dyn CommandRunner>,
    pub obfuscator: Arc<dyn FileTransform>,
    pub deobfuscator: Arc<dyn FileTransform>,
    pub analyzer: Arc<dyn ComplexityAnalyzer>,
}

impl Collaborators {
    /// The transform that produces `stage` from its predecessor.
    pub fn transform_for(&self, stage: Stage) -> Option<&dyn FileTransform> {
        match stage {
            Stage::Original => None,
            Stage::Obfuscated => Some(self.obfuscator.as_ref()),
            Stage::Deobfuscated => Some(self.deobfuscator.as_ref()),
        }
    }
}
