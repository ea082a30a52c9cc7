//! Stage generation: download, obfuscate, deobfuscate.
//!
//! Each transition runs, in order:
//! 1. overwrite confirmation for the destination stage
//! 2. removal of the destination (recreated empty)
//! 3. copy of every non-source entry from the predecessor stage
//! 4. the stage's transform over the predecessor's source directory
//! 5. for stages driven by profile options, a snapshot of those options
//!
//! Regeneration is not atomic. A collaborator failure leaves the destination
//! in whatever state it reached; the next run sees it through the probe and
//! asks before overwriting it.

use serde_json::Map;
use std::sync::Arc;
use tracing::{info, warn};

use crate::collab::Collaborators;
use crate::config::CommandLines;
use crate::domain::{PipelineError, Result, Stage};
use crate::gate::{Decider, Decision, OverwriteGate};
use crate::layout::PathLayout;
use crate::obs;
use crate::probe::StageProbe;
use crate::session::Session;
use crate::tree;

/// What happened to a stage that was asked to be generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Generated,

    /// The stage existed and the overwrite was declined.
    Skipped,
}

/// Executes stage transitions for one session.
pub struct PipelineRunner {
    session: Session,
    layout: PathLayout,
    collab: Collaborators,
    decider: Arc<dyn Decider>,
    commands: CommandLines,
}

impl PipelineRunner {
    pub fn new(
        session: Session,
        collab: Collaborators,
        decider: Arc<dyn Decider>,
        commands: CommandLines,
    ) -> Self {
        let layout = session.layout();
        Self {
            session,
            layout,
            collab,
            decider,
            commands,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn layout(&self) -> &PathLayout {
        &self.layout
    }

    pub fn probe(&self) -> StageProbe<'_> {
        StageProbe::new(&self.layout)
    }

    pub fn decider(&self) -> &dyn Decider {
        self.decider.as_ref()
    }

    fn repo(&self) -> &str {
        &self.session.identity().name
    }

    /// Generate `stage` from its predecessor, which must already be present.
    ///
    /// Use [`crate::resolver::StageResolver`] to fill in missing
    /// predecessors first.
    pub async fn generate(&self, stage: Stage) -> Result<StageOutcome> {
        let result = match stage.predecessor() {
            None => self.download().await,
            Some(prereq) => self.derive(prereq, stage).await,
        };
        if let Err(e) = &result {
            if e.is_collaborator_failure() {
                obs::emit_collaborator_failed(stage, e);
            }
        }
        result
    }

    /// Clone the original code, then install its dependencies.
    pub async fn download(&self) -> Result<StageOutcome> {
        let stage = Stage::Original;
        let root = self.layout.stage_root(stage)?;
        let remote = &self.session.identity().remote_url;

        if !self.confirm_overwrite(stage).await? {
            info!(repo = %self.repo(), "Skipping download");
            obs::emit_stage_skipped(self.repo(), stage);
            return Ok(StageOutcome::Skipped);
        }

        tree::recreate_dir(&root)?;
        info!(repo = %self.repo(), remote = %remote, dest = %root.display(), "Downloading");
        self.collab.fetcher.fetch(remote, &root).await?;

        let install = self.commands.install.trim();
        if !install.is_empty() {
            info!(command = %install, "Installing dependencies");
            let output = self.collab.commands.run(install, &root).await?;
            if !output.success() {
                warn!(
                    exit_code = output.exit_code,
                    stderr = %output.stderr.trim(),
                    "Dependency install failed"
                );
            }
        }

        let files = tree::list_files(&root)?.len();
        obs::emit_stage_generated(self.repo(), stage, files);
        Ok(StageOutcome::Generated)
    }

    async fn derive(&self, prereq: Stage, stage: Stage) -> Result<StageOutcome> {
        let src_root = self.layout.stage_root(prereq)?;
        let dest_root = self.layout.stage_root(stage)?;
        let transform = self.collab.transform_for(stage).ok_or_else(|| {
            PipelineError::Configuration(format!("no transform produces the {stage} stage"))
        })?;

        if !self.confirm_overwrite(stage).await? {
            obs::emit_stage_skipped(self.repo(), stage);
            return Ok(StageOutcome::Skipped);
        }

        tree::recreate_dir(&dest_root)?;
        tree::copy_tree_except(&src_root, &dest_root, self.layout.source_subdir())?;

        let src_dir = self.layout.source_dir(prereq)?;
        let empty = Map::new();
        let options = self.profile_options(stage).unwrap_or(&empty);
        let transformed = if src_dir.is_dir() {
            info!(stage = %stage, src = %src_dir.display(), "Writing transformed files");
            let dest_dir = self.layout.source_dir(stage)?;
            tree::transform_tree(&src_dir, &dest_dir, transform, options).await?
        } else {
            warn!(
                stage = %stage,
                src = %src_dir.display(),
                "Source directory missing, nothing to transform"
            );
            0
        };

        if let Some(options) = self.profile_options(stage) {
            let snapshot = self.layout.profile_snapshot()?;
            if let Some(parent) = snapshot.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&snapshot, serde_json::to_string_pretty(options)?)?;
            obs::emit_artifact_recorded("profile", stage, &snapshot);
        }

        obs::emit_stage_generated(self.repo(), stage, transformed);
        Ok(StageOutcome::Generated)
    }

    /// Options handed to the transform producing `stage`, when it uses the
    /// profile.
    fn profile_options(&self, stage: Stage) -> Option<&Map<String, serde_json::Value>> {
        match stage {
            Stage::Obfuscated => self.session.profile().map(|p| &p.options),
            _ => None,
        }
    }

    async fn confirm_overwrite(&self, stage: Stage) -> Result<bool> {
        let present = self.probe().presence(stage)?;
        let decision = Decision::Overwrite {
            repo: self.repo().to_string(),
            stage,
        };
        Ok(OverwriteGate::new(self.decider())
            .confirm(present, &decision)
            .await)
    }
}
