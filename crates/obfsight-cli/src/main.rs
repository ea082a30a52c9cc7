//! Obfsight - obfuscation pipeline analyser CLI
//!
//! The `obfsight` command tracks a JavaScript repository through three
//! stages and records what each stage does to code complexity and tests.
//!
//! ## Commands
//!
//! - `repo`: Add or list repository configs
//! - `profile`: List obfuscation profiles
//! - `status`: Show which stages are present
//! - `generate`: Build a stage, generating missing prerequisites on request
//! - `complexity`: Record complexity reports
//! - `test`: Record test logs
//! - `compare`: Compare profiles on a complexity metric
//! - `menu`: Interactive session

mod console;
mod menu;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

use obfsight_core::config::{DEFAULT_INSTALL_COMMAND, DEFAULT_TEST_COMMAND};
use obfsight_core::obs::SessionSpan;
use obfsight_core::{
    ArtifactRecorder, AssumeYes, CommandLines, Decider, PipelineRunner, RepositoryIdentity,
    Session, Settings, Stage, StageOutcome, StageResolver, ToolCommands,
};

use crate::console::ConsoleDecider;

#[derive(Parser)]
#[command(name = "obfsight")]
#[command(author = "Stevedores Org")]
#[command(version = obfsight_core::VERSION)]
#[command(about = "Obfuscation pipeline analyser", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Answer yes to every overwrite and prerequisite question
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Root directory for generated stages and stats
    #[arg(long, global = true, env = "OBFSIGHT_STORAGE", default_value = "storage")]
    storage: PathBuf,

    /// Directory holding repos/ and obfuscation-profiles/
    #[arg(long, global = true, env = "OBFSIGHT_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Filter command producing obfuscated code (stdin → stdout)
    #[arg(long, global = true, env = "OBFSIGHT_OBFUSCATE_CMD")]
    obfuscate_cmd: Option<String>,

    /// Filter command producing deobfuscated code (stdin → stdout)
    #[arg(long, global = true, env = "OBFSIGHT_DEOBFUSCATE_CMD")]
    deobfuscate_cmd: Option<String>,

    /// Command printing JSON file metrics for a directory
    #[arg(long, global = true, env = "OBFSIGHT_COMPLEXITY_CMD")]
    complexity_cmd: Option<String>,

    /// Dependency install command run after download and before tests
    #[arg(long, global = true, env = "OBFSIGHT_INSTALL_CMD", default_value = DEFAULT_INSTALL_COMMAND)]
    install_cmd: String,

    /// Test command
    #[arg(long, global = true, env = "OBFSIGHT_TEST_CMD", default_value = DEFAULT_TEST_COMMAND)]
    test_cmd: String,
}

impl SettingsArgs {
    fn into_settings(self) -> Settings {
        Settings::new(self.storage, self.config_dir)
            .with_commands(CommandLines {
                install: self.install_cmd,
                test: self.test_cmd,
            })
            .with_tools(ToolCommands {
                obfuscate: self.obfuscate_cmd.unwrap_or_default(),
                deobfuscate: self.deobfuscate_cmd.unwrap_or_default(),
                complexity: self.complexity_cmd.unwrap_or_default(),
            })
    }
}

/// Repository and profile selection shared by stage commands.
#[derive(Args, Debug)]
struct Target {
    /// Repository config file under <config>/repos (with or without .json)
    #[arg(short, long)]
    repo: String,

    /// Obfuscation profile name
    #[arg(short, long)]
    profile: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage repository configs
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },

    /// Manage obfuscation profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Show which stages are present for a repository
    Status {
        #[command(flatten)]
        target: Target,
    },

    /// Generate a stage, asking before generating missing prerequisites
    Generate {
        /// original, obfuscated or deobfuscated
        stage: Stage,

        #[command(flatten)]
        target: Target,
    },

    /// Record complexity reports for stages
    Complexity {
        /// Stages to analyze, or `all`
        #[arg(required = true)]
        stages: Vec<String>,

        #[command(flatten)]
        target: Target,
    },

    /// Run tests for stages and record their logs
    Test {
        /// Stages to test, or `all`
        #[arg(required = true)]
        stages: Vec<String>,

        #[command(flatten)]
        target: Target,
    },

    /// Compare profiles on a complexity metric, relative to the original
    Compare {
        /// Repository config file under <config>/repos (with or without .json)
        #[arg(short, long)]
        repo: String,

        /// Profiles to compare, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        profiles: Vec<String>,

        /// Report field to compare
        #[arg(long, default_value = "totalCyclomatic")]
        metric: String,
    },

    /// Interactive session
    Menu,
}

#[derive(Subcommand)]
enum RepoAction {
    /// Write a repository config
    Add {
        /// Repository name, also the storage directory name
        name: String,

        /// Source-code subdirectory inside the repository
        #[arg(long)]
        src_dir: String,

        /// Git remote to clone
        #[arg(long)]
        remote: String,

        /// Config file name (default: <name>.json)
        #[arg(long)]
        file: Option<String>,
    },

    /// List repository configs
    List,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List obfuscation profiles
    List,
}

/// Settings plus the decider chosen on the command line.
pub struct App {
    pub settings: Settings,
    pub decider: Arc<dyn Decider>,
}

impl App {
    pub fn open_session(&self, repo: &str, profile: Option<&str>) -> Result<Session> {
        let identity = self
            .settings
            .repository_store()
            .load(repo)
            .with_context(|| format!("Failed to load repository config '{repo}'"))?;
        let profile = profile
            .map(|name| {
                self.settings
                    .profile_store()
                    .load(name)
                    .with_context(|| format!("Failed to load profile '{name}'"))
            })
            .transpose()?;
        Ok(Session::new(&self.settings.storage_root, identity, profile)?)
    }

    fn runner(&self, session: &Session) -> PipelineRunner {
        PipelineRunner::new(
            session.clone(),
            obfsight_exec::collaborators(&self.settings.tools),
            self.decider.clone(),
            self.settings.commands.clone(),
        )
    }

    fn recorder(&self, session: &Session) -> ArtifactRecorder {
        ArtifactRecorder::new(
            session,
            obfsight_exec::collaborators(&self.settings.tools),
            self.settings.commands.clone(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    obfsight_core::telemetry::init_tracing(cli.json, level);

    let decider: Arc<dyn Decider> = if cli.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(ConsoleDecider)
    };
    let app = App {
        settings: cli.settings.into_settings(),
        decider,
    };

    match cli.command {
        Commands::Repo { action } => match action {
            RepoAction::Add {
                name,
                src_dir,
                remote,
                file,
            } => cmd_repo_add(&app.settings, &name, &src_dir, &remote, file.as_deref()),
            RepoAction::List => cmd_repo_list(&app.settings),
        },
        Commands::Profile { action } => match action {
            ProfileAction::List => cmd_profile_list(&app.settings),
        },
        Commands::Status { target } => {
            let session = app.open_session(&target.repo, target.profile.as_deref())?;
            cmd_status(&session)
        }
        Commands::Generate { stage, target } => {
            let session = app.open_session(&target.repo, target.profile.as_deref())?;
            cmd_generate(&app, &session, stage).await
        }
        Commands::Complexity { stages, target } => {
            let stages = parse_stages(&stages)?;
            let session = app.open_session(&target.repo, target.profile.as_deref())?;
            cmd_complexity(&app, &session, &stages).await
        }
        Commands::Test { stages, target } => {
            let stages = parse_stages(&stages)?;
            let session = app.open_session(&target.repo, target.profile.as_deref())?;
            cmd_test(&app, &session, &stages).await
        }
        Commands::Compare {
            repo,
            profiles,
            metric,
        } => cmd_compare(&app.settings, &repo, &profiles, &metric),
        Commands::Menu => menu::run(&app).await,
    }
}

/// Expand stage arguments; `all` means every stage in order.
fn parse_stages(args: &[String]) -> Result<Vec<Stage>> {
    if args.iter().any(|a| a.eq_ignore_ascii_case("all")) {
        return Ok(Stage::ORDER.to_vec());
    }
    let mut stages = Vec::new();
    for arg in args {
        let stage: Stage = arg.parse().map_err(anyhow::Error::msg)?;
        if !stages.contains(&stage) {
            stages.push(stage);
        }
    }
    Ok(stages)
}

/// Write a repository config
pub fn cmd_repo_add(
    settings: &Settings,
    name: &str,
    src_dir: &str,
    remote: &str,
    file: Option<&str>,
) -> Result<()> {
    let identity = RepositoryIdentity::new(name, src_dir, remote);
    let path = settings
        .repository_store()
        .save(file.unwrap_or(name), &identity)
        .with_context(|| format!("Failed to save repository config for '{name}'"))?;
    println!("Saved repository '{}' to {}", name, path.display());
    Ok(())
}

/// List repository configs
pub fn cmd_repo_list(settings: &Settings) -> Result<()> {
    let store = settings.repository_store();
    let files = store.list()?;
    if files.is_empty() {
        println!("No repositories in {}", store.dir().display());
        return Ok(());
    }
    for file in files {
        match store.load(&file) {
            Ok(identity) => println!(
                "{:<24} {} (src: {})",
                file, identity.remote_url, identity.source_subdir
            ),
            Err(e) => println!("{file:<24} invalid: {e}"),
        }
    }
    Ok(())
}

/// List obfuscation profiles
pub fn cmd_profile_list(settings: &Settings) -> Result<()> {
    let store = settings.profile_store();
    let names = store.list()?;
    if names.is_empty() {
        println!("No profiles in {}", store.dir().display());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

/// Show stage presence
pub fn cmd_status(session: &Session) -> Result<()> {
    let layout = session.layout();
    println!(
        "Repository: {} ({})",
        session.identity().name,
        session.identity().remote_url
    );
    println!("Profile:    {}", session.profile_name().unwrap_or("-"));
    for (stage, presence) in obfsight_core::StageProbe::new(&layout).snapshot() {
        let state = match presence {
            Some(true) => "present",
            Some(false) => "absent",
            None => "no profile",
        };
        println!("  {:<14} {}", stage.to_string(), state);
    }
    Ok(())
}

/// Generate a stage and whatever prerequisites the user agrees to
pub async fn cmd_generate(app: &App, session: &Session, stage: Stage) -> Result<()> {
    let _span = SessionSpan::enter(&session.identity().name, session.profile_name());
    let runner = app.runner(session);

    let resolution = StageResolver::new(&runner)
        .ensure(stage)
        .await
        .with_context(|| format!("Failed to generate {stage} stage"))?;

    for step in &resolution.steps {
        let verb = match step.outcome {
            StageOutcome::Generated => "generated",
            StageOutcome::Skipped => "kept existing",
        };
        println!("{}: {}", step.stage, verb);
    }
    Ok(())
}

/// Record complexity reports
pub async fn cmd_complexity(app: &App, session: &Session, stages: &[Stage]) -> Result<()> {
    let _span = SessionSpan::enter(&session.identity().name, session.profile_name());
    let recorder = app.recorder(session);

    let mut failed = 0;
    for &stage in stages {
        match recorder.record_complexity(stage).await {
            Ok(report) => {
                let path = recorder.layout().complexity_report(stage)?;
                println!(
                    "{}: {} files, cyclomatic {}, functions {}, logical lines {} -> {}",
                    stage,
                    report.file_count(),
                    report.total_cyclomatic,
                    report.total_n_functions,
                    report.total_logical_lines,
                    path.display()
                );
            }
            Err(e) => {
                failed += 1;
                eprintln!("{stage}: {e}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} complexity reports failed", stages.len());
    }
    Ok(())
}

/// Run tests and record logs
pub async fn cmd_test(app: &App, session: &Session, stages: &[Stage]) -> Result<()> {
    let _span = SessionSpan::enter(&session.identity().name, session.profile_name());
    let recorder = app.recorder(session);
    info!(stages = stages.len(), "Running tests");

    let mut failed = 0;
    for (stage, result) in recorder.record_tests(stages).await {
        match result {
            Ok(outcome) if outcome.passed() => {
                println!("{stage}: passed -> {}", outcome.result_log.display());
            }
            Ok(outcome) => {
                println!(
                    "{stage}: exit status {} -> {}",
                    outcome.exit_code,
                    outcome.error_log.display()
                );
            }
            Err(e) => {
                failed += 1;
                eprintln!("{stage}: {e}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} test runs could not be recorded", stages.len());
    }
    Ok(())
}

/// Print per-profile ratios of a complexity metric
pub fn cmd_compare(settings: &Settings, repo: &str, profiles: &[String], metric: &str) -> Result<()> {
    let identity = settings
        .repository_store()
        .load(repo)
        .with_context(|| format!("Failed to load repository config '{repo}'"))?;
    let comparison = obfsight_core::compare_profiles(&settings.storage_root, &identity, profiles, metric)
        .with_context(|| format!("Failed to compare profiles on {metric}"))?;

    println!("{} (original = {})", comparison.metric, comparison.original);
    println!("  {:<20} {:>12} {:>14}", "profile", "obfuscated", "deobfuscated");
    for ratios in &comparison.profiles {
        println!(
            "  {:<20} {:>12.3} {:>14.3}",
            ratios.profile, ratios.obfuscated, ratios.deobfuscated
        );
    }
    Ok(())
}
