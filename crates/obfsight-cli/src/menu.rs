//! Interactive session menu
//!
//! Keeps the selected repository and profile between actions. Failures are
//! printed and the menu comes back.

use anyhow::{bail, Result};
use dialoguer::{Input, Select};

use obfsight_core::{Session, Stage};

use crate::console::blocking;
use crate::App;

const ACTIONS: &[&str] = &[
    "Select repository",
    "Add repository",
    "Select profile",
    "Show status",
    "Generate stage",
    "Record complexity",
    "Run tests",
    "Compare profiles",
    "Quit",
];

#[derive(Debug, Default)]
struct MenuState {
    repo: Option<String>,
    profile: Option<String>,
}

impl MenuState {
    fn header(&self) -> String {
        format!(
            "repo: {} | profile: {}",
            self.repo.as_deref().unwrap_or("-"),
            self.profile.as_deref().unwrap_or("-")
        )
    }
}

pub async fn run(app: &App) -> Result<()> {
    let mut state = MenuState::default();

    loop {
        println!();
        println!("{}", state.header());
        let selection = blocking(|| {
            Select::new()
                .with_prompt("What would you like to do?")
                .items(ACTIONS)
                .default(0)
                .interact_opt()
        })
        .await?;

        let result = match selection {
            Some(0) => select_repository(app, &mut state).await,
            Some(1) => add_repository(app).await,
            Some(2) => select_profile(app, &mut state).await,
            Some(3) => session(app, &state).and_then(|s| crate::cmd_status(&s)),
            Some(4) => generate(app, &state).await,
            Some(5) => complexity(app, &state).await,
            Some(6) => run_tests(app, &state).await,
            Some(7) => compare(app, &state).await,
            _ => return Ok(()),
        };

        if let Err(e) = result {
            eprintln!("error: {e:#}");
        }
    }
}

fn session(app: &App, state: &MenuState) -> Result<Session> {
    let Some(repo) = state.repo.as_deref() else {
        bail!("select a repository first");
    };
    app.open_session(repo, state.profile.as_deref())
}

async fn pick(prompt: &str, items: Vec<String>) -> Result<Option<String>> {
    if items.is_empty() {
        bail!("nothing to choose from");
    }
    let prompt = prompt.to_string();
    let choices = items.clone();
    let index = blocking(move || {
        Select::new()
            .with_prompt(prompt)
            .items(&choices)
            .default(0)
            .interact_opt()
    })
    .await?;
    Ok(index.map(|i| items[i].clone()))
}

async fn pick_stages(prompt: &str) -> Result<Vec<Stage>> {
    let mut items: Vec<String> = Stage::ORDER.iter().map(|s| s.to_string()).collect();
    items.push("all".to_string());
    match pick(prompt, items).await? {
        Some(choice) if choice == "all" => Ok(Stage::ORDER.to_vec()),
        Some(choice) => Ok(vec![choice.parse().map_err(anyhow::Error::msg)?]),
        None => Ok(Vec::new()),
    }
}

async fn select_repository(app: &App, state: &mut MenuState) -> Result<()> {
    let files = app.settings.repository_store().list()?;
    if let Some(file) = pick("Repository", files).await? {
        // Validate before remembering it.
        app.open_session(&file, None)?;
        state.repo = Some(file);
    }
    Ok(())
}

async fn add_repository(app: &App) -> Result<()> {
    let name: String = blocking(|| Input::<String>::new().with_prompt("Name").interact_text()).await?;
    let src_dir: String = blocking(|| {
        Input::<String>::new()
            .with_prompt("Source directory")
            .default("src".to_string())
            .interact_text()
    })
    .await?;
    let remote: String = blocking(|| Input::<String>::new().with_prompt("Git remote").interact_text()).await?;
    crate::cmd_repo_add(&app.settings, &name, &src_dir, &remote, None)
}

async fn select_profile(app: &App, state: &mut MenuState) -> Result<()> {
    let names = app.settings.profile_store().list()?;
    if let Some(name) = pick("Obfuscation profile", names).await? {
        app.settings.profile_store().load(&name)?;
        state.profile = Some(name);
    }
    Ok(())
}

async fn generate(app: &App, state: &MenuState) -> Result<()> {
    let session = session(app, state)?;
    let items = Stage::ORDER.iter().map(|s| s.to_string()).collect();
    let Some(choice) = pick("Stage to generate", items).await? else {
        return Ok(());
    };
    let stage: Stage = choice.parse().map_err(anyhow::Error::msg)?;
    crate::cmd_generate(app, &session, stage).await
}

async fn complexity(app: &App, state: &MenuState) -> Result<()> {
    let session = session(app, state)?;
    let stages = pick_stages("Stage to analyze").await?;
    if stages.is_empty() {
        return Ok(());
    }
    crate::cmd_complexity(app, &session, &stages).await
}

async fn run_tests(app: &App, state: &MenuState) -> Result<()> {
    let session = session(app, state)?;
    let stages = pick_stages("Stage to test").await?;
    if stages.is_empty() {
        return Ok(());
    }
    crate::cmd_test(app, &session, &stages).await
}

async fn compare(app: &App, state: &MenuState) -> Result<()> {
    let Some(repo) = state.repo.clone() else {
        bail!("select a repository first");
    };
    let default_profiles = state.profile.clone().unwrap_or_default();
    let profiles: String = blocking(move || {
        Input::<String>::new()
            .with_prompt("Profiles (comma separated)")
            .default(default_profiles)
            .interact_text()
    })
    .await?;
    let metric: String = blocking(|| {
        Input::<String>::new()
            .with_prompt("Metric")
            .default("totalCyclomatic".to_string())
            .interact_text()
    })
    .await?;
    crate::cmd_compare(&app.settings, &repo, &split_profiles(&profiles), &metric)
}

fn split_profiles(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
