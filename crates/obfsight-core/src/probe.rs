//! Stage presence checks.

use std::path::Path;

use crate::domain::{Result, Stage};
use crate::layout::PathLayout;

/// Whether a directory exists and has at least one entry.
///
/// Read errors count as absent.
pub fn dir_has_entries(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Reads stage presence from the filesystem on every call.
#[derive(Debug, Clone, Copy)]
pub struct StageProbe<'a> {
    layout: &'a PathLayout,
}

impl<'a> StageProbe<'a> {
    pub fn new(layout: &'a PathLayout) -> Self {
        Self { layout }
    }

    /// Presence of `stage`.
    ///
    /// Returns a configuration error only when the stage path is undefined
    /// because no profile is bound.
    pub fn presence(&self, stage: Stage) -> Result<bool> {
        let root = self.layout.stage_root(stage)?;
        Ok(dir_has_entries(&root))
    }

    /// Presence of every stage in dependency order. Stages whose path is
    /// undefined are reported as `None`.
    pub fn snapshot(&self) -> Vec<(Stage, Option<bool>)> {
        Stage::ORDER
            .iter()
            .map(|&stage| (stage, self.presence(stage).ok()))
            .collect()
    }
}
