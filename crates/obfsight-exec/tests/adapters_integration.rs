//! Integration tests: the core pipeline driven by subprocess collaborators.

use obfsight_core::fakes::{FakeFetcher, ScriptedDecider};
use obfsight_core::{
    ArtifactRecorder, CommandLines, PipelineError, PipelineRunner, RepositoryIdentity, Session,
    Stage, StageResolver, ToolCommands, TransformProfile,
};
use serde_json::{json, Map};
use std::fs;
use std::sync::Arc;

fn session(root: &std::path::Path) -> Session {
    let mut options = Map::new();
    options.insert("compact".to_string(), json!(true));
    Session::new(
        root,
        RepositoryIdentity::new("demo", "src", "https://example/demo.git"),
        Some(TransformProfile::new("p1", options)),
    )
    .unwrap()
}

fn tools() -> ToolCommands {
    ToolCommands {
        obfuscate: "tr a-z A-Z".to_string(),
        deobfuscate: "tr A-Z a-z".to_string(),
        complexity: "printf '[]' #".to_string(),
    }
}

/// Shell commands run in place of npm, with the fake fetcher standing in for git.
fn commands() -> CommandLines {
    CommandLines {
        install: "true".to_string(),
        test: "echo 'all passing'; echo 'warning: deprecated' >&2".to_string(),
    }
}

/// Test: filter commands transform the tree, shell commands record logs
#[tokio::test]
async fn test_pipeline_with_shell_collaborators() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path());
    let mut collab = obfsight_exec::collaborators(&tools());
    collab.fetcher = Arc::new(FakeFetcher::new());

    let runner = PipelineRunner::new(
        session.clone(),
        collab.clone(),
        Arc::new(ScriptedDecider::new([true, true])),
        commands(),
    );
    StageResolver::new(&runner)
        .ensure(Stage::Deobfuscated)
        .await
        .expect("resolution failed");

    let layout = session.layout();
    let obf = fs::read_to_string(layout.source_dir(Stage::Obfuscated).unwrap().join("index.js")).unwrap();
    assert!(obf.starts_with("FUNCTION ADD(A, B)"));
    let deob =
        fs::read_to_string(layout.source_dir(Stage::Deobfuscated).unwrap().join("index.js")).unwrap();
    assert!(deob.starts_with("function add(a, b)"));

    let recorder = ArtifactRecorder::new(&session, collab, commands());
    let report = recorder.record_complexity(Stage::Obfuscated).await.unwrap();
    assert_eq!(report.total_cyclomatic, 0);

    let outcome = recorder.record_test(Stage::Deobfuscated).await.unwrap();
    assert!(outcome.passed());
    assert_eq!(fs::read_to_string(&outcome.result_log).unwrap(), "all passing\n");
    assert_eq!(
        fs::read_to_string(&outcome.error_log).unwrap(),
        "warning: deprecated\n"
    );
}

/// Test: an unconfigured obfuscator fails the generation as a configuration error
#[tokio::test]
async fn test_unconfigured_obfuscator() {
    let dir = tempfile::tempdir().unwrap();
    let mut collab = obfsight_exec::collaborators(&ToolCommands::default());
    collab.fetcher = Arc::new(FakeFetcher::new());

    let runner = PipelineRunner::new(
        session(dir.path()),
        collab,
        Arc::new(ScriptedDecider::new([])),
        commands(),
    );
    runner.download().await.unwrap();

    let err = runner.generate(Stage::Obfuscated).await.unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
}
