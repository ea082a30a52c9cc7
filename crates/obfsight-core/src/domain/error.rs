//! Error taxonomy for stage resolution and artifact recording.

use std::path::PathBuf;

use super::stage::Stage;

/// Errors produced by the pipeline core.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or invalid profile/config where one is required.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A prerequisite stage is absent and generating it was declined.
    #[error("missing prerequisite: {stage} stage is not present")]
    MissingPrerequisite { stage: Stage },

    /// An artifact was requested for a stage that is not on disk.
    #[error("stage not found: {stage} stage is not present")]
    StageNotFound { stage: Stage },

    /// A complexity report needed for a comparison has not been recorded.
    #[error("report not found: {}", path.display())]
    ReportNotFound { path: PathBuf },

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("transform failed for {path}: {message}")]
    Transform { path: PathBuf, message: String },

    #[error("complexity analyzer error: {0}")]
    Analyzer(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether the error came from an external collaborator rather than the
    /// orchestration itself.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::Fetch(_)
                | PipelineError::Transform { .. }
                | PipelineError::Analyzer(_)
                | PipelineError::Command(_)
        )
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_prerequisite_names_stage() {
        let err = PipelineError::MissingPrerequisite {
            stage: Stage::Original,
        };
        let msg = err.to_string();
        assert!(msg.contains("missing prerequisite"));
        assert!(msg.contains("original"));
    }

    #[test]
    fn test_transform_error_display() {
        let err = PipelineError::Transform {
            path: PathBuf::from("src/index.js"),
            message: "unexpected token".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("src/index.js"));
        assert!(msg.contains("unexpected token"));
    }

    #[test]
    fn test_collaborator_classification() {
        assert!(PipelineError::Fetch("auth".into()).is_collaborator_failure());
        assert!(PipelineError::Command("spawn".into()).is_collaborator_failure());
        assert!(!PipelineError::Configuration("no profile".into()).is_collaborator_failure());
        assert!(!PipelineError::StageNotFound {
            stage: Stage::Obfuscated
        }
        .is_collaborator_failure());
    }
}
