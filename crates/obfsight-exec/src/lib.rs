//! Obfsight Exec - subprocess-backed collaborators
//!
//! Implements the `obfsight-core` collaborator traits on top of external
//! programs:
//! - `git clone` for downloads
//! - `sh -c` for install and test command lines
//! - stdin/stdout filter commands for obfuscation and deobfuscation
//! - a metrics command for complexity analysis

pub mod analyzer;
pub mod git;
pub mod shell;
pub mod transform;

use std::sync::Arc;

use obfsight_core::{Collaborators, ToolCommands};

// Re-export key types
pub use analyzer::CommandAnalyzer;
pub use git::GitFetcher;
pub use shell::ShellCommandRunner;
pub use transform::{CommandTransform, OPTIONS_ENV};

/// Build the production collaborator set from configured tool commands.
pub fn collaborators(tools: &ToolCommands) -> Collaborators {
    Collaborators {
        fetcher: Arc::new(GitFetcher::new()),
        commands: Arc::new(ShellCommandRunner::new()),
        obfuscator: Arc::new(CommandTransform::new("obfuscate", tools.obfuscate.clone())),
        deobfuscator: Arc::new(CommandTransform::new(
            "deobfuscate",
            tools.deobfuscate.clone(),
        )),
        analyzer: Arc::new(CommandAnalyzer::new(tools.complexity.clone())),
    }
}
