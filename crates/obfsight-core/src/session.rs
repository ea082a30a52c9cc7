//! Explicit session context passed into every pipeline operation.

use std::path::{Path, PathBuf};

use crate::domain::{RepositoryIdentity, Result, TransformProfile};
use crate::layout::PathLayout;

/// The repository and profile a caller is working on.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    storage_root: PathBuf,
    identity: RepositoryIdentity,
    profile: Option<TransformProfile>,
}

impl Session {
    /// Create a session, validating the identity and profile names.
    pub fn new(
        storage_root: impl Into<PathBuf>,
        identity: RepositoryIdentity,
        profile: Option<TransformProfile>,
    ) -> Result<Self> {
        identity.validate()?;
        if let Some(profile) = &profile {
            profile.validate()?;
        }
        Ok(Self {
            storage_root: storage_root.into(),
            identity,
            profile,
        })
    }

    /// Same repository with a different profile.
    pub fn with_profile(&self, profile: Option<TransformProfile>) -> Result<Self> {
        Self::new(self.storage_root.clone(), self.identity.clone(), profile)
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn identity(&self) -> &RepositoryIdentity {
        &self.identity
    }

    pub fn profile(&self) -> Option<&TransformProfile> {
        self.profile.as_ref()
    }

    pub fn profile_name(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.name.as_str())
    }

    pub fn layout(&self) -> PathLayout {
        PathLayout::new(&self.storage_root, &self.identity, self.profile.as_ref())
    }
}
