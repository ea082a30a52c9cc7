//! Confirmation before destructive writes.
//!
//! The question is a [`Decision`]; who answers it is a [`Decider`]. The
//! console implementation lives in the CLI, tests use the fakes.

use async_trait::async_trait;
use std::fmt;
use tracing::{debug, warn};

use crate::domain::Stage;

/// A yes/no question raised by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The stage already exists and would be deleted.
    Overwrite { repo: String, stage: Stage },

    /// `stage` is missing and is needed to build the requested target.
    GeneratePrerequisite {
        repo: String,
        stage: Stage,
        remote: String,
    },
}

impl Decision {
    pub fn stage(&self) -> Stage {
        match self {
            Decision::Overwrite { stage, .. } | Decision::GeneratePrerequisite { stage, .. } => {
                *stage
            }
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Overwrite { repo, stage } => {
                write!(f, "Overwrite existing {stage} code in repo '{repo}'?")
            }
            Decision::GeneratePrerequisite {
                repo,
                stage: Stage::Original,
                remote,
            } => write!(
                f,
                "Missing original code for repo '{repo}'. Download it from {remote}?"
            ),
            Decision::GeneratePrerequisite { repo, stage, .. } => write!(
                f,
                "Missing {stage} code for repo '{repo}'. Generate it first?"
            ),
        }
    }
}

/// Answers pipeline questions.
///
/// Anything other than an explicit yes must return `false`.
#[async_trait]
pub trait Decider: Send + Sync {
    async fn confirm(&self, decision: &Decision) -> bool;
}

/// Approves every question. Used for `--yes` runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

#[async_trait]
impl Decider for AssumeYes {
    async fn confirm(&self, _decision: &Decision) -> bool {
        true
    }
}

/// Denies every question. Used for non-interactive runs without `--yes`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeNo;

#[async_trait]
impl Decider for AssumeNo {
    async fn confirm(&self, _decision: &Decision) -> bool {
        false
    }
}

/// Guard in front of every stage directory removal.
pub struct OverwriteGate<'a> {
    decider: &'a dyn Decider,
}

impl<'a> OverwriteGate<'a> {
    pub fn new(decider: &'a dyn Decider) -> Self {
        Self { decider }
    }

    /// Returns `true` when the caller may destroy and rewrite the stage.
    ///
    /// Nothing to lose means no question is asked.
    pub async fn confirm(&self, state_present: bool, decision: &Decision) -> bool {
        if !state_present {
            debug!(stage = %decision.stage(), "Stage absent, no overwrite confirmation needed");
            return true;
        }
        let approved = self.decider.confirm(decision).await;
        if !approved {
            warn!(stage = %decision.stage(), "Overwrite declined");
        }
        approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedDecider;

    fn overwrite() -> Decision {
        Decision::Overwrite {
            repo: "demo".to_string(),
            stage: Stage::Obfuscated,
        }
    }

    #[tokio::test]
    async fn test_absent_state_never_prompts() {
        let decider = ScriptedDecider::new([]);
        let gate = OverwriteGate::new(&decider);
        assert!(gate.confirm(false, &overwrite()).await);
        assert!(decider.asked().is_empty());
    }

    #[tokio::test]
    async fn test_present_state_asks_and_respects_no() {
        let decider = ScriptedDecider::new([false]);
        let gate = OverwriteGate::new(&decider);
        assert!(!gate.confirm(true, &overwrite()).await);
        assert_eq!(decider.asked(), vec![overwrite()]);
    }

    #[tokio::test]
    async fn test_present_state_asks_and_respects_yes() {
        let decider = ScriptedDecider::new([true]);
        let gate = OverwriteGate::new(&decider);
        assert!(gate.confirm(true, &overwrite()).await);
    }

    #[tokio::test]
    async fn test_exhausted_script_defaults_to_deny() {
        let decider = ScriptedDecider::new([]);
        let gate = OverwriteGate::new(&decider);
        assert!(!gate.confirm(true, &overwrite()).await);
    }

    #[test]
    fn test_prompt_wording() {
        let download = Decision::GeneratePrerequisite {
            repo: "demo".to_string(),
            stage: Stage::Original,
            remote: "https://example/demo.git".to_string(),
        };
        assert!(download.to_string().contains("https://example/demo.git"));
        assert!(overwrite().to_string().starts_with("Overwrite"));
    }
}
