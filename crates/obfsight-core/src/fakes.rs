//! In-memory fakes for the collaborator traits (testing only)
//!
//! `FakeWorld` bundles a fetcher that writes a small npm-style repository, a
//! command runner that records calls, tagging transforms and a token-counting
//! analyzer. None of them spawn processes or touch the network.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::collab::{
    Collaborators, CommandOutput, CommandRunner, ComplexityAnalyzer, FileTransform, SourceFetcher,
};
use crate::complexity::{FileMetrics, HalsteadMetrics};
use crate::domain::{PipelineError, Result};
use crate::gate::{Decider, Decision};
use crate::tree;

// ---------------------------------------------------------------------------
// ScriptedDecider
// ---------------------------------------------------------------------------

/// Answers questions from a fixed script, then denies. Records every question.
#[derive(Debug, Default)]
pub struct ScriptedDecider {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<Decision>>,
}

impl ScriptedDecider {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<Decision> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Decider for ScriptedDecider {
    async fn confirm(&self, decision: &Decision) -> bool {
        self.asked.lock().unwrap().push(decision.clone());
        self.answers.lock().unwrap().pop_front().unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// FakeFetcher
// ---------------------------------------------------------------------------

/// Files written by [`FakeFetcher`], relative to the clone root.
pub const FIXTURE_FILES: &[(&str, &str)] = &[
    ("package.json", r#"{"name":"demo","scripts":{"test":"node test/index.test.js"}}"#),
    ("README.md", "# demo\n"),
    (
        "src/index.js",
        "function add(a, b) {\n  if (a > b) {\n    return a + b;\n  }\n  return b + a;\n}\nmodule.exports = add;\n",
    ),
    (
        "src/lib/util.js",
        "function id(x) {\n  return x;\n}\nmodule.exports = id;\n",
    ),
    ("test/index.test.js", "require('../src/index.js');\n"),
];

/// Writes [`FIXTURE_FILES`] instead of cloning.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    failing: bool,
    fetches: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(&self, remote: &str, dest: &Path) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(PipelineError::Fetch(format!(
                "authentication failed for {remote}"
            )));
        }
        for (relative, content) in FIXTURE_FILES {
            let path = dest.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingCommandRunner
// ---------------------------------------------------------------------------

/// Returns a canned output for every command and records `(command, cwd)`.
#[derive(Debug)]
pub struct RecordingCommandRunner {
    output: CommandOutput,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl Default for RecordingCommandRunner {
    fn default() -> Self {
        Self::with_output(CommandOutput {
            stdout: "1 passing\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
        })
    }
}

impl RecordingCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(output: CommandOutput) -> Self {
        Self {
            output,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingCommandRunner {
    async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), cwd.to_path_buf()));
        Ok(self.output.clone())
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// Prepends a fixed marker to every file.
#[derive(Debug, Clone)]
pub struct PrefixTransform {
    prefix: String,
}

impl PrefixTransform {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl FileTransform for PrefixTransform {
    async fn transform(&self, source: &str, _options: &Map<String, Value>) -> Result<String> {
        Ok(format!("{}{}", self.prefix, source))
    }
}

/// Rejects every file as unparseable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTransform;

#[async_trait]
impl FileTransform for FailingTransform {
    async fn transform(&self, _source: &str, _options: &Map<String, Value>) -> Result<String> {
        Err(PipelineError::Transform {
            path: PathBuf::new(),
            message: "unsupported syntax".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// TokenAnalyzer
// ---------------------------------------------------------------------------

/// Deterministic stand-in for a real analyzer: counts keywords and tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenAnalyzer;

impl TokenAnalyzer {
    pub fn measure(path: &str, source: &str) -> FileMetrics {
        let words: Vec<&str> = source
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| !w.is_empty())
            .collect();
        let branches = words
            .iter()
            .filter(|w| matches!(**w, "if" | "for" | "while" | "case"))
            .count() as u64;
        let functions = words.iter().filter(|w| **w == "function").count() as u64;
        let operators = source
            .chars()
            .filter(|c| "+-*/=<>!&|?:;,(){}[].".contains(*c))
            .count() as u64;
        let operands = words.len() as u64;

        FileMetrics {
            path: path.to_string(),
            cyclomatic: branches + 1,
            halstead: HalsteadMetrics {
                operators,
                operands,
                effort: (operators * operands) as f64 / 2.0,
            },
            logical_lines: source.lines().filter(|l| !l.trim().is_empty()).count() as u64,
            function_count: functions,
        }
    }
}

#[async_trait]
impl ComplexityAnalyzer for TokenAnalyzer {
    async fn analyze(&self, dir: &Path) -> Result<Vec<FileMetrics>> {
        let mut metrics = Vec::new();
        for relative in tree::list_files(dir)? {
            let source = std::fs::read_to_string(dir.join(&relative))?;
            let path = relative.to_string_lossy().replace('\\', "/");
            metrics.push(Self::measure(&path, &source));
        }
        Ok(metrics)
    }
}

// ---------------------------------------------------------------------------
// FakeWorld
// ---------------------------------------------------------------------------

/// A complete set of fakes with handles kept for assertions.
pub struct FakeWorld {
    pub fetcher: Arc<FakeFetcher>,
    pub commands: Arc<RecordingCommandRunner>,
    pub obfuscator: Arc<dyn FileTransform>,
    pub deobfuscator: Arc<dyn FileTransform>,
    pub analyzer: Arc<TokenAnalyzer>,
}

impl Default for FakeWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWorld {
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(FakeFetcher::new()),
            commands: Arc::new(RecordingCommandRunner::new()),
            obfuscator: Arc::new(PrefixTransform::new("/* obfuscated */\n")),
            deobfuscator: Arc::new(PrefixTransform::new("/* deobfuscated */\n")),
            analyzer: Arc::new(TokenAnalyzer),
        }
    }

    pub fn with_failing_fetcher(mut self) -> Self {
        self.fetcher = Arc::new(FakeFetcher::failing());
        self
    }

    pub fn with_failing_obfuscator(mut self) -> Self {
        self.obfuscator = Arc::new(FailingTransform);
        self
    }

    pub fn with_command_output(mut self, output: CommandOutput) -> Self {
        self.commands = Arc::new(RecordingCommandRunner::with_output(output));
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            fetcher: self.fetcher.clone(),
            commands: self.commands.clone(),
            obfuscator: self.obfuscator.clone(),
            deobfuscator: self.deobfuscator.clone(),
            analyzer: self.analyzer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_analyzer_counts() {
        let metrics = TokenAnalyzer::measure("a.js", FIXTURE_FILES[2].1);
        assert_eq!(metrics.cyclomatic, 2);
        assert_eq!(metrics.function_count, 1);
        assert_eq!(metrics.logical_lines, 7);
        assert!(metrics.halstead.operators > 0);
    }

    #[tokio::test]
    async fn test_scripted_decider_runs_out_to_deny() {
        let decider = ScriptedDecider::new([true]);
        let decision = Decision::Overwrite {
            repo: "demo".to_string(),
            stage: crate::domain::Stage::Original,
        };
        assert!(decider.confirm(&decision).await);
        assert!(!decider.confirm(&decision).await);
        assert_eq!(decider.asked().len(), 2);
    }
}
