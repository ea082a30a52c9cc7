//! Structured lifecycle events for stage generation and artifact recording.
//!
//! Events are emitted at `info!` level with an `event` field so they can be
//! filtered out of JSON logs (`--json`).

use std::path::Path;
use tracing::info;

use crate::domain::Stage;

/// RAII guard that tags every log line inside it with the repository and
/// profile being worked on.
pub struct SessionSpan {
    _span: tracing::span::EnteredSpan,
}

impl SessionSpan {
    pub fn enter(repo: &str, profile: Option<&str>) -> Self {
        let span = tracing::info_span!(
            "obfsight.session",
            repo = %repo,
            profile = %profile.unwrap_or("-"),
        );
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a stage directory was (re)generated.
pub fn emit_stage_generated(repo: &str, stage: Stage, files: usize) {
    info!(event = "stage.generated", repo = %repo, stage = %stage, files = files);
}

/// Emit event: a stage was left untouched because the overwrite was declined.
pub fn emit_stage_skipped(repo: &str, stage: Stage) {
    info!(event = "stage.skipped", repo = %repo, stage = %stage);
}

/// Emit event: an artifact was written.
pub fn emit_artifact_recorded(kind: &str, stage: Stage, path: &Path) {
    info!(
        event = "artifact.recorded",
        kind = %kind,
        stage = %stage,
        path = %path.display(),
    );
}

/// Emit event: a collaborator failed; the session continues.
pub fn emit_collaborator_failed(stage: Stage, error: &dyn std::fmt::Display) {
    tracing::error!(event = "collaborator.failed", stage = %stage, error = %error);
}
