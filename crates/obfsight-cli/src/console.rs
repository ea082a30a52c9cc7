//! Terminal prompts.

use anyhow::{Context, Result};
use async_trait::async_trait;
use dialoguer::Confirm;

use obfsight_core::{Decider, Decision};

/// Asks pipeline questions on the terminal. Defaults to "no".
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDecider;

#[async_trait]
impl Decider for ConsoleDecider {
    async fn confirm(&self, decision: &Decision) -> bool {
        let prompt = decision.to_string();
        let answer = blocking(move || Confirm::new().with_prompt(prompt).default(false).interact()).await;
        // A closed terminal or interrupted prompt counts as a refusal.
        answer.unwrap_or(false)
    }
}

/// Run a dialoguer prompt off the async runtime.
pub async fn blocking<T, F>(prompt: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> dialoguer::Result<T> + Send + 'static,
{
    let answer = tokio::task::spawn_blocking(prompt)
        .await
        .context("prompt task failed")??;
    Ok(answer)
}
