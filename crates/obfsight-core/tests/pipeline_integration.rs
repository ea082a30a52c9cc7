//! Integration tests for stage resolution and artifact recording with fakes.

use obfsight_core::fakes::{FakeWorld, ScriptedDecider};
use obfsight_core::{
    ArtifactRecorder, CommandLines, CommandOutput, Decision, PipelineError, PipelineRunner,
    RepositoryIdentity, Session, Settings, Stage, StageOutcome, StageResolver, TransformProfile,
};
use serde_json::{json, Map};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn demo_identity() -> RepositoryIdentity {
    RepositoryIdentity::new("demo", "src", "https://example/demo.git")
}

fn demo_session(root: &Path) -> Session {
    let mut options = Map::new();
    options.insert("compact".to_string(), json!(true));
    Session::new(
        root,
        demo_identity(),
        Some(TransformProfile::new("p1", options)),
    )
    .expect("valid session")
}

/// Test: ensuring the last stage from nothing builds the whole chain in order
#[tokio::test]
async fn test_ensure_deobfuscated_builds_full_chain() {
    let dir = tempfile::tempdir().unwrap();
    let world = FakeWorld::new();
    let decider = Arc::new(ScriptedDecider::new([true, true]));
    let runner = PipelineRunner::new(
        demo_session(dir.path()),
        world.collaborators(),
        decider.clone(),
        CommandLines::default(),
    );

    let resolution = StageResolver::new(&runner)
        .ensure(Stage::Deobfuscated)
        .await
        .expect("resolution failed");

    assert_eq!(
        resolution.generated(),
        vec![Stage::Original, Stage::Obfuscated, Stage::Deobfuscated]
    );
    for stage in Stage::ORDER {
        assert!(runner.probe().presence(stage).unwrap(), "{stage} missing");
    }

    // One question per missing prerequisite, nearest first.
    let asked = decider.asked();
    assert_eq!(asked.len(), 2);
    assert!(matches!(
        asked[0],
        Decision::GeneratePrerequisite {
            stage: Stage::Obfuscated,
            ..
        }
    ));
    assert!(matches!(
        asked[1],
        Decision::GeneratePrerequisite {
            stage: Stage::Original,
            ..
        }
    ));

    let deob = fs::read_to_string(
        runner
            .layout()
            .source_dir(Stage::Deobfuscated)
            .unwrap()
            .join("index.js"),
    )
    .unwrap();
    assert!(deob.starts_with("/* deobfuscated */\n/* obfuscated */\n"));
}

/// Test: declining the prerequisite aborts without creating anything
#[tokio::test]
async fn test_declined_prerequisite_is_missing_prerequisite() {
    let dir = tempfile::tempdir().unwrap();
    let world = FakeWorld::new();
    let runner = PipelineRunner::new(
        demo_session(dir.path()),
        world.collaborators(),
        Arc::new(ScriptedDecider::new([false])),
        CommandLines::default(),
    );

    let err = StageResolver::new(&runner)
        .ensure(Stage::Obfuscated)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::MissingPrerequisite {
            stage: Stage::Original
        }
    ));
    assert!(!runner.probe().presence(Stage::Original).unwrap());
    assert!(!runner.probe().presence(Stage::Obfuscated).unwrap());
    assert_eq!(world.fetcher.fetch_count(), 0);
}

/// Test: the demo/p1 walkthrough records obfuscated complexity under the profile
#[tokio::test]
async fn test_demo_profile_complexity_report_location() {
    let dir = tempfile::tempdir().unwrap();
    let world = FakeWorld::new();
    let session = demo_session(dir.path());
    let runner = PipelineRunner::new(
        session.clone(),
        world.collaborators(),
        Arc::new(ScriptedDecider::new([true])),
        CommandLines::default(),
    );
    StageResolver::new(&runner)
        .ensure(Stage::Obfuscated)
        .await
        .unwrap();

    let recorder = ArtifactRecorder::new(&session, world.collaborators(), CommandLines::default());
    let report = recorder.record_complexity(Stage::Obfuscated).await.unwrap();

    let expected = dir
        .path()
        .join("demo/p1/stats/complexities/obfuscated.json");
    assert!(expected.is_file());
    assert_eq!(report.file_count(), 2);
    assert_eq!(report.reports[0].path, "index.js");
    assert_eq!(report.reports[1].path, "lib/util.js");

    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&expected).unwrap()).unwrap();
    assert_eq!(parsed["totalNFunctions"], json!(2));
    assert!(parsed["sourceDigest"].as_str().unwrap().len() == 64);
}

/// Test: complexity reports are byte-identical across runs on unchanged trees
#[tokio::test]
async fn test_complexity_all_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let world = FakeWorld::new();
    let session = demo_session(dir.path());
    let runner = PipelineRunner::new(
        session.clone(),
        world.collaborators(),
        Arc::new(ScriptedDecider::new([true, true])),
        CommandLines::default(),
    );
    StageResolver::new(&runner)
        .ensure(Stage::Deobfuscated)
        .await
        .unwrap();

    let recorder = ArtifactRecorder::new(&session, world.collaborators(), CommandLines::default());
    let first = recorder.record_complexity_all().await;
    assert!(first.iter().all(|(_, r)| r.is_ok()));
    let snapshot: Vec<Vec<u8>> = Stage::ORDER
        .iter()
        .map(|s| fs::read(session.layout().complexity_report(*s).unwrap()).unwrap())
        .collect();

    recorder.record_complexity_all().await;
    for (stage, bytes) in Stage::ORDER.iter().zip(snapshot) {
        let again = fs::read(session.layout().complexity_report(*stage).unwrap()).unwrap();
        assert_eq!(bytes, again, "{stage} report changed");
    }
}

/// Test: a failing test command still returns and writes both logs
#[tokio::test]
async fn test_failing_test_command_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let world = FakeWorld::new().with_command_output(CommandOutput {
        stdout: "1 failing\n".to_string(),
        stderr: "Error: boom\n".to_string(),
        exit_code: 2,
    });
    let session = demo_session(dir.path());
    let runner = PipelineRunner::new(
        session.clone(),
        world.collaborators(),
        Arc::new(ScriptedDecider::new([])),
        CommandLines::default(),
    );
    runner.download().await.unwrap();

    let recorder = ArtifactRecorder::new(&session, world.collaborators(), CommandLines::default());
    let outcome = recorder.record_test(Stage::Original).await.unwrap();

    assert_eq!(outcome.exit_code, 2);
    assert_eq!(fs::read_to_string(&outcome.result_log).unwrap(), "1 failing\n");
    assert_eq!(
        fs::read_to_string(&outcome.error_log).unwrap(),
        "Error: boom\nobfsight: exit status 2\n"
    );
    assert_eq!(
        outcome.error_log,
        dir.path().join("demo/p1/stats/tests/original/error.log")
    );
}

/// Test: concurrent test runs on all three stages each get their own logs
#[tokio::test]
async fn test_record_tests_all_stages_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let world = FakeWorld::new();
    let session = demo_session(dir.path());
    let runner = PipelineRunner::new(
        session.clone(),
        world.collaborators(),
        Arc::new(ScriptedDecider::new([true, true])),
        CommandLines::default(),
    );
    StageResolver::new(&runner)
        .ensure(Stage::Deobfuscated)
        .await
        .unwrap();

    let recorder = ArtifactRecorder::new(&session, world.collaborators(), CommandLines::default());
    let results = recorder.record_tests(&Stage::ORDER).await;

    assert_eq!(results.len(), 3);
    for (stage, result) in results {
        let outcome = result.unwrap_or_else(|e| panic!("{stage} failed: {e}"));
        assert_eq!(outcome.stage, stage);
        assert!(outcome.result_log.ends_with(format!("{stage}/result.log")));
        assert!(outcome.result_log.is_file());
    }

    let test_cwds: Vec<_> = world
        .commands
        .calls()
        .into_iter()
        .filter(|(cmd, _)| cmd == "npm install && npm test")
        .map(|(_, cwd)| cwd)
        .collect();
    assert_eq!(test_cwds.len(), 3);
}

/// Test: an existing stage with a declined overwrite is skipped, not rebuilt
#[tokio::test]
async fn test_skip_keeps_existing_stage() {
    let dir = tempfile::tempdir().unwrap();
    let world = FakeWorld::new();
    let runner = PipelineRunner::new(
        demo_session(dir.path()),
        world.collaborators(),
        Arc::new(ScriptedDecider::new([false])),
        CommandLines::default(),
    );
    runner.download().await.unwrap();

    assert_eq!(
        runner.generate(Stage::Original).await.unwrap(),
        StageOutcome::Skipped
    );
    assert_eq!(world.fetcher.fetch_count(), 1);
}

/// Test: settings stores drive session construction end to end
#[tokio::test]
async fn test_session_from_config_stores() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::new(dir.path().join("store"), dir.path().join("config"));

    settings
        .repository_store()
        .save("demo", &demo_identity())
        .unwrap();
    fs::create_dir_all(settings.profile_store().dir()).unwrap();
    fs::write(
        settings.profile_store().dir().join("p1.json"),
        r#"{"compact":true}"#,
    )
    .unwrap();

    let identity = settings.repository_store().load("demo.json").unwrap();
    let profile = settings.profile_store().load("p1").unwrap();
    let session = Session::new(&settings.storage_root, identity, Some(profile)).unwrap();

    assert_eq!(
        session.layout().stage_root(Stage::Obfuscated).unwrap(),
        dir.path().join("store/demo/p1/obfuscated")
    );
}
