//! Pipeline stage definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A state of a repository's code in the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Code as cloned from the remote.
    Original,

    /// Original code passed through the obfuscator with the active profile.
    Obfuscated,

    /// Obfuscated code passed through the deobfuscator.
    Deobfuscated,
}

impl Stage {
    /// Dependency order. Each stage is generated from the one before it.
    pub const ORDER: [Stage; 3] = [Stage::Original, Stage::Obfuscated, Stage::Deobfuscated];

    /// Directory and artifact slug for this stage.
    pub fn slug(&self) -> &'static str {
        match self {
            Stage::Original => "original",
            Stage::Obfuscated => "obfuscated",
            Stage::Deobfuscated => "deobfuscated",
        }
    }

    /// The stage this one is generated from, if any.
    pub fn predecessor(&self) -> Option<Stage> {
        let idx = Self::ORDER.iter().position(|s| s == self)?;
        idx.checked_sub(1).map(|i| Self::ORDER[i])
    }

    /// Whether this stage lives under a profile directory.
    pub fn is_profile_scoped(&self) -> bool {
        self.predecessor().is_some()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .iter()
            .copied()
            .find(|stage| stage.slug().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown stage '{s}' (expected original, obfuscated or deobfuscated)")
            })
    }
}
