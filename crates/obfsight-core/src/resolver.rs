//! Prerequisite resolution for stage generation.
//!
//! `ensure(target)` walks backwards through [`Stage::predecessor`]:
//!
//! - `Original` has no predecessor and is downloaded directly.
//! - Otherwise, if the predecessor is absent the decider is asked whether to
//!   build it first. A refusal aborts with `MissingPrerequisite`; acceptance
//!   recurses into the predecessor.
//! - The target itself is then generated behind the overwrite gate.
//!
//! Presence is re-read before every question, so a prerequisite that exists
//! is never re-downloaded or re-prompted.

use futures::future::{BoxFuture, FutureExt};
use tracing::{info, warn};

use crate::domain::{PipelineError, Result, Stage};
use crate::gate::Decision;
use crate::runner::{PipelineRunner, StageOutcome};

/// One stage touched while resolving a target, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedStage {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// Result of `ensure`: every stage generated or skipped, prerequisites first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub steps: Vec<ResolvedStage>,
}

impl Resolution {
    /// Outcome for the requested target (the last step).
    pub fn target_outcome(&self) -> Option<StageOutcome> {
        self.steps.last().map(|s| s.outcome)
    }

    pub fn generated(&self) -> Vec<Stage> {
        self.steps
            .iter()
            .filter(|s| s.outcome == StageOutcome::Generated)
            .map(|s| s.stage)
            .collect()
    }
}

/// Dependency state machine over a [`PipelineRunner`].
pub struct StageResolver<'a> {
    runner: &'a PipelineRunner,
}

impl<'a> StageResolver<'a> {
    pub fn new(runner: &'a PipelineRunner) -> Self {
        Self { runner }
    }

    /// Make sure `target` exists, generating missing prerequisites with the
    /// decider's consent.
    pub async fn ensure(&self, target: Stage) -> Result<Resolution> {
        // Fail on an unbound profile before any question is asked.
        self.runner.layout().stage_root(target)?;

        let mut resolution = Resolution::default();
        self.ensure_into(target, &mut resolution).await?;
        Ok(resolution)
    }

    fn ensure_into<'b>(
        &'b self,
        target: Stage,
        resolution: &'b mut Resolution,
    ) -> BoxFuture<'b, Result<()>> {
        async move {
            if let Some(prereq) = target.predecessor() {
                self.ensure_prerequisite(prereq, resolution).await?;
            }
            let outcome = self.runner.generate(target).await?;
            resolution.steps.push(ResolvedStage {
                stage: target,
                outcome,
            });
            Ok(())
        }
        .boxed()
    }

    async fn ensure_prerequisite(&self, prereq: Stage, resolution: &mut Resolution) -> Result<()> {
        let probe = self.runner.probe();
        if probe.presence(prereq)? {
            return Ok(());
        }

        let identity = self.runner.session().identity();
        let decision = Decision::GeneratePrerequisite {
            repo: identity.name.clone(),
            stage: prereq,
            remote: identity.remote_url.clone(),
        };
        if !self.runner.decider().confirm(&decision).await {
            warn!(stage = %prereq, "Prerequisite generation declined");
            return Err(PipelineError::MissingPrerequisite { stage: prereq });
        }

        info!(stage = %prereq, "Generating missing prerequisite");
        self.ensure_into(prereq, resolution).await?;

        // The prerequisite may still be empty, e.g. a clone of an empty repo.
        if !probe.presence(prereq)? {
            return Err(PipelineError::MissingPrerequisite { stage: prereq });
        }
        Ok(())
    }
}
