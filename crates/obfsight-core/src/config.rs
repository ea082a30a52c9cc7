//! Settings and the on-disk config records for repositories and profiles.
//!
//! ```text
//! <config>/repos/<file>.json                   {name, srcDir, remote}
//! <config>/obfuscation-profiles/<name>.json    arbitrary options object
//! ```

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::{PipelineError, RepositoryIdentity, Result, TransformProfile};

pub const REPOS_DIR: &str = "repos";
pub const PROFILES_DIR: &str = "obfuscation-profiles";

pub const DEFAULT_INSTALL_COMMAND: &str = "npm install";
pub const DEFAULT_TEST_COMMAND: &str = "npm test";

/// Shell command lines run against stage trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLines {
    /// Installs dependencies after a download and before tests.
    pub install: String,

    pub test: String,
}

impl Default for CommandLines {
    fn default() -> Self {
        Self {
            install: DEFAULT_INSTALL_COMMAND.to_string(),
            test: DEFAULT_TEST_COMMAND.to_string(),
        }
    }
}

impl CommandLines {
    /// The install-then-test script used for test recording.
    pub fn test_script(&self) -> String {
        let install = self.install.trim();
        let test = self.test.trim();
        if install.is_empty() {
            test.to_string()
        } else {
            format!("{install} && {test}")
        }
    }
}

/// Command lines behind the subprocess-backed transforms and analyzer.
///
/// An empty command means the collaborator is not configured; using it
/// fails with a configuration error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCommands {
    /// Reads a file on stdin, writes the obfuscated file on stdout.
    pub obfuscate: String,

    /// Reads a file on stdin, writes the deobfuscated file on stdout.
    pub deobfuscate: String,

    /// Invoked with a directory appended; prints a JSON array of file metrics.
    pub complexity: String,
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root under which each repository gets `<name>/`.
    pub storage_root: PathBuf,

    /// Directory holding `repos/` and `obfuscation-profiles/`.
    pub config_dir: PathBuf,

    pub commands: CommandLines,

    pub tools: ToolCommands,
}

impl Settings {
    pub fn new(storage_root: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            config_dir: config_dir.into(),
            commands: CommandLines::default(),
            tools: ToolCommands::default(),
        }
    }

    pub fn with_commands(mut self, commands: CommandLines) -> Self {
        self.commands = commands;
        self
    }

    pub fn with_tools(mut self, tools: ToolCommands) -> Self {
        self.tools = tools;
        self
    }

    pub fn repository_store(&self) -> RepositoryStore {
        RepositoryStore::new(self.config_dir.join(REPOS_DIR))
    }

    pub fn profile_store(&self) -> ProfileStore {
        ProfileStore::new(self.config_dir.join(PROFILES_DIR))
    }
}

/// Repository identity records, one JSON file each.
#[derive(Debug, Clone)]
pub struct RepositoryStore {
    dir: PathBuf,
}

impl RepositoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record file names, sorted. A missing directory lists as empty.
    pub fn list(&self) -> Result<Vec<String>> {
        list_json_files(&self.dir)
    }

    /// Load a record by file name (`demo.json`) or bare name (`demo`).
    pub fn load(&self, file: &str) -> Result<RepositoryIdentity> {
        let path = self.dir.join(with_json_extension(file));
        let raw = fs::read_to_string(&path).map_err(|e| {
            PipelineError::Configuration(format!(
                "cannot read repository config {}: {e}",
                path.display()
            ))
        })?;
        let identity: RepositoryIdentity = serde_json::from_str(&raw).map_err(|e| {
            PipelineError::Configuration(format!(
                "invalid repository config {}: {e}",
                path.display()
            ))
        })?;
        identity.validate()?;
        Ok(identity)
    }

    /// Write a record; returns the path written.
    pub fn save(&self, file: &str, identity: &RepositoryIdentity) -> Result<PathBuf> {
        identity.validate()?;
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(with_json_extension(file));
        let content = serde_json::to_string_pretty(identity)?;
        fs::write(&path, content)?;
        info!(repo = %identity.name, path = %path.display(), "Saved repository config");
        Ok(path)
    }
}

/// Named transform profiles, one options document per file.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Profile names (file stems), sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(list_json_files(&self.dir)?
            .into_iter()
            .map(|file| stem(&file).to_string())
            .collect())
    }

    /// Load a profile by name or file name. The name is the file stem.
    pub fn load(&self, name: &str) -> Result<TransformProfile> {
        let file = with_json_extension(name);
        let path = self.dir.join(&file);
        let raw = fs::read_to_string(&path).map_err(|e| {
            PipelineError::Configuration(format!("cannot read profile {}: {e}", path.display()))
        })?;
        let options: Map<String, Value> = serde_json::from_str(&raw).map_err(|e| {
            PipelineError::Configuration(format!(
                "profile {} is not a JSON object: {e}",
                path.display()
            ))
        })?;
        let profile = TransformProfile::new(stem(&file), options);
        profile.validate()?;
        Ok(profile)
    }
}

fn list_json_files(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type()?.is_file() && name.ends_with(".json") {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

fn with_json_extension(name: &str) -> String {
    if name.ends_with(".json") {
        name.to_string()
    } else {
        format!("{name}.json")
    }
}

fn stem(file: &str) -> &str {
    file.strip_suffix(".json").unwrap_or(file)
}
