//! Filesystem layout of a tracked repository.
//!
//! ```text
//! <storage>/<repo>/original/<srcDir>/...
//! <storage>/<repo>/<profile>/obfuscated/<srcDir>/...
//! <storage>/<repo>/<profile>/deobfuscated/<srcDir>/...
//! <storage>/<repo>/<profile>/stats/profile.json
//! <storage>/<repo>/<profile>/stats/complexities/<stage>.json
//! <storage>/<repo>/<profile>/stats/tests/<stage>/{result.log,error.log}
//! ```
//!
//! Every method here is pure path arithmetic; nothing touches the disk.

use std::path::{Path, PathBuf};

use crate::domain::{PipelineError, RepositoryIdentity, Result, Stage, TransformProfile};

pub const STATS_DIR: &str = "stats";
pub const COMPLEXITIES_DIR: &str = "complexities";
pub const TESTS_DIR: &str = "tests";
pub const PROFILE_SNAPSHOT_FILE: &str = "profile.json";
pub const RESULT_LOG_FILE: &str = "result.log";
pub const ERROR_LOG_FILE: &str = "error.log";

/// Path mapping for one repository and an optional profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLayout {
    repo_root: PathBuf,
    source_subdir: String,
    profile: Option<String>,
}

impl PathLayout {
    pub fn new(
        storage_root: impl AsRef<Path>,
        identity: &RepositoryIdentity,
        profile: Option<&TransformProfile>,
    ) -> Self {
        Self {
            repo_root: storage_root.as_ref().join(&identity.name),
            source_subdir: identity.source_subdir.clone(),
            profile: profile.map(|p| p.name.clone()),
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn source_subdir(&self) -> &str {
        &self.source_subdir
    }

    pub fn profile_name(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// `<repo>/<profile>`, or a configuration error when no profile is bound.
    pub fn profile_root(&self) -> Result<PathBuf> {
        match &self.profile {
            Some(name) => Ok(self.repo_root.join(name)),
            None => Err(PipelineError::Configuration(
                "no transform profile is set".to_string(),
            )),
        }
    }

    /// Root directory of a stage.
    pub fn stage_root(&self, stage: Stage) -> Result<PathBuf> {
        if stage.is_profile_scoped() {
            Ok(self.profile_root()?.join(stage.slug()))
        } else {
            Ok(self.repo_root.join(stage.slug()))
        }
    }

    /// Source-code subdirectory of a stage.
    pub fn source_dir(&self, stage: Stage) -> Result<PathBuf> {
        Ok(self.stage_root(stage)?.join(&self.source_subdir))
    }

    pub fn stats_root(&self) -> Result<PathBuf> {
        Ok(self.profile_root()?.join(STATS_DIR))
    }

    pub fn complexities_dir(&self) -> Result<PathBuf> {
        Ok(self.stats_root()?.join(COMPLEXITIES_DIR))
    }

    pub fn complexity_report(&self, stage: Stage) -> Result<PathBuf> {
        Ok(self
            .complexities_dir()?
            .join(format!("{}.json", stage.slug())))
    }

    pub fn test_log_dir(&self, stage: Stage) -> Result<PathBuf> {
        Ok(self.stats_root()?.join(TESTS_DIR).join(stage.slug()))
    }

    pub fn result_log(&self, stage: Stage) -> Result<PathBuf> {
        Ok(self.test_log_dir(stage)?.join(RESULT_LOG_FILE))
    }

    pub fn error_log(&self, stage: Stage) -> Result<PathBuf> {
        Ok(self.test_log_dir(stage)?.join(ERROR_LOG_FILE))
    }

    pub fn profile_snapshot(&self) -> Result<PathBuf> {
        Ok(self.stats_root()?.join(PROFILE_SNAPSHOT_FILE))
    }
}
