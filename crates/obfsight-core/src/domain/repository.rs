//! Repository identity and transform profile.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{PipelineError, Result};
use super::stage::Stage;

/// Identity of a tracked repository.
///
/// Serialized as `{name, srcDir, remote}`, the layout of the repository
/// config records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryIdentity {
    /// Name, also the directory under the storage root.
    pub name: String,

    /// Directory within the repository holding the source code to transform.
    #[serde(rename = "srcDir")]
    pub source_subdir: String,

    /// Git remote the original code is cloned from.
    #[serde(rename = "remote")]
    pub remote_url: String,
}

impl RepositoryIdentity {
    pub fn new(
        name: impl Into<String>,
        source_subdir: impl Into<String>,
        remote_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_subdir: source_subdir.into(),
            remote_url: remote_url.into(),
        }
    }

    /// Check that the name and source subdirectory are usable as single path
    /// components.
    pub fn validate(&self) -> Result<()> {
        validate_component("repository name", &self.name)?;
        validate_component("source directory", &self.source_subdir)?;
        if self.remote_url.trim().is_empty() {
            return Err(PipelineError::Configuration(format!(
                "repository '{}' has no remote",
                self.name
            )));
        }
        Ok(())
    }
}

/// A named bundle of obfuscation options.
///
/// The options are never interpreted here; they are handed to the
/// obfuscation collaborator as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformProfile {
    pub name: String,

    #[serde(default)]
    pub options: Map<String, Value>,
}

impl TransformProfile {
    pub fn new(name: impl Into<String>, options: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    /// A profile with an empty options bag.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Map::new())
    }

    /// The name becomes a directory beside the repository-level stages, so
    /// it must not be one of their slugs.
    pub fn validate(&self) -> Result<()> {
        validate_component("profile name", &self.name)?;
        let clash = Stage::ORDER
            .iter()
            .filter(|stage| !stage.is_profile_scoped())
            .find(|stage| stage.slug().eq_ignore_ascii_case(&self.name));
        if let Some(stage) = clash {
            return Err(PipelineError::Configuration(format!(
                "profile name '{}' collides with the {stage} stage directory",
                self.name
            )));
        }
        Ok(())
    }
}

fn validate_component(what: &str, value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\');
    if invalid {
        return Err(PipelineError::Configuration(format!(
            "invalid {what}: '{value}'"
        )));
    }
    Ok(())
}
