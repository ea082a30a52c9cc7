//! Complexity reports and test logs for present stages.

use futures::future::join_all;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::collab::Collaborators;
use crate::complexity::ComplexityReport;
use crate::config::CommandLines;
use crate::domain::{PipelineError, Result, Stage};
use crate::layout::PathLayout;
use crate::obs;
use crate::probe::StageProbe;
use crate::session::Session;
use crate::tree;

/// Result of one test recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub stage: Stage,
    pub exit_code: i32,
    pub result_log: PathBuf,
    pub error_log: PathBuf,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs the analyzer and the test command against stage trees and persists
/// what they produce under the stats directory.
pub struct ArtifactRecorder {
    layout: PathLayout,
    collab: Collaborators,
    commands: CommandLines,
}

impl ArtifactRecorder {
    pub fn new(session: &Session, collab: Collaborators, commands: CommandLines) -> Self {
        Self {
            layout: session.layout(),
            collab,
            commands,
        }
    }

    pub fn layout(&self) -> &PathLayout {
        &self.layout
    }

    fn require_present(&self, stage: Stage) -> Result<()> {
        if StageProbe::new(&self.layout).presence(stage)? {
            Ok(())
        } else {
            Err(PipelineError::StageNotFound { stage })
        }
    }

    /// Analyze the stage's source directory and write its complexity report.
    pub async fn record_complexity(&self, stage: Stage) -> Result<ComplexityReport> {
        let report_path = self.layout.complexity_report(stage)?;
        self.require_present(stage)?;

        let src_dir = self.layout.source_dir(stage)?;
        if !src_dir.is_dir() {
            return Err(PipelineError::Configuration(format!(
                "{stage} stage has no source directory at {}",
                src_dir.display()
            )));
        }

        info!(stage = %stage, src = %src_dir.display(), "Computing complexity");
        let metrics = self.collab.analyzer.analyze(&src_dir).await.map_err(|e| {
            obs::emit_collaborator_failed(stage, &e);
            e
        })?;
        let report = ComplexityReport::aggregate(metrics, tree::digest_tree(&src_dir)?);

        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = serde_json::to_string_pretty(&report)?;
        content.push('\n');
        fs::write(&report_path, content)?;

        obs::emit_artifact_recorded("complexity", stage, &report_path);
        Ok(report)
    }

    /// Complexity for every stage in order. Each stage succeeds or fails on
    /// its own.
    pub async fn record_complexity_all(&self) -> Vec<(Stage, Result<ComplexityReport>)> {
        let mut results = Vec::new();
        for stage in Stage::ORDER {
            results.push((stage, self.record_complexity(stage).await));
        }
        results
    }

    /// Run install-then-test in the stage root and capture its output.
    ///
    /// A failing test run is recorded, not raised: stdout goes to
    /// `result.log`, stderr to `error.log`, followed by the exit status when it
    /// is non-zero.
    pub async fn record_test(&self, stage: Stage) -> Result<TestOutcome> {
        let log_dir = self.layout.test_log_dir(stage)?;
        self.require_present(stage)?;

        let cwd = self.layout.stage_root(stage)?;
        let script = self.commands.test_script();
        fs::create_dir_all(&log_dir)?;

        info!(stage = %stage, command = %script, "Running tests");
        let output = self.collab.commands.run(&script, &cwd).await.map_err(|e| {
            obs::emit_collaborator_failed(stage, &e);
            e
        })?;

        let result_log = self.layout.result_log(stage)?;
        let error_log = self.layout.error_log(stage)?;
        fs::write(&result_log, &output.stdout)?;

        let mut stderr = output.stderr.clone();
        if !output.success() {
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&format!("obfsight: exit status {}\n", output.exit_code));
            warn!(stage = %stage, exit_code = output.exit_code, "Tests finished with errors");
        } else {
            info!(stage = %stage, "Tests finished without errors");
        }
        fs::write(&error_log, stderr)?;

        obs::emit_artifact_recorded("test", stage, &log_dir);
        Ok(TestOutcome {
            stage,
            exit_code: output.exit_code,
            result_log,
            error_log,
        })
    }

    /// Run tests for several stages concurrently and wait for all of them.
    ///
    /// Stage trees and log directories never overlap, so the runs share
    /// nothing.
    pub async fn record_tests(&self, stages: &[Stage]) -> Vec<(Stage, Result<TestOutcome>)> {
        let runs = stages.iter().map(|&stage| async move {
            let result = self.record_test(stage).await;
            (stage, result)
        });
        join_all(runs).await
    }
}
