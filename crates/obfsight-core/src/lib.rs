//! Obfsight Core Library
//!
//! Stage resolution, generation and artifact recording for the
//! original → obfuscated → deobfuscated pipeline. Subprocess-backed
//! collaborators live in `obfsight-exec`.

pub mod collab;
pub mod compare;
pub mod complexity;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod gate;
pub mod layout;
pub mod obs;
pub mod probe;
pub mod recorder;
pub mod resolver;
pub mod runner;
pub mod session;
pub mod telemetry;
pub mod tree;

pub use collab::{
    Collaborators, CommandOutput, CommandRunner, ComplexityAnalyzer, FileTransform, SourceFetcher,
};
pub use compare::{compare_profiles, ProfileComparison, ProfileRatios};
pub use complexity::{ComplexityReport, FileMetrics, HalsteadMetrics};
pub use config::{CommandLines, ProfileStore, RepositoryStore, Settings, ToolCommands};
pub use domain::{PipelineError, RepositoryIdentity, Result, Stage, TransformProfile};
pub use gate::{AssumeNo, AssumeYes, Decider, Decision, OverwriteGate};
pub use layout::PathLayout;
pub use probe::StageProbe;
pub use recorder::{ArtifactRecorder, TestOutcome};
pub use resolver::{Resolution, ResolvedStage, StageResolver};
pub use runner::{PipelineRunner, StageOutcome};
pub use session::Session;

/// Crate version, reported by `obfsight --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
