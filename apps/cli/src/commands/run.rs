//! `gatetune run`: the full recipe.

use crate::commands::types::{ProviderArgs, RecipeArgs};
use crate::config::{cancellation, load_gateway_config, load_secrets, load_settings, provider_client};
use crate::progress::ConsoleProgressSink;
use anyhow::{Context, Result};
use colored::Colorize;
use gatetune_training::{ClickHouseStore, RunOutcome, TrainingError};
use std::path::PathBuf;

pub async fn execute(recipe: RecipeArgs, provider: ProviderArgs, output: Option<PathBuf>) -> Result<()> {
    // Every precondition is checked before the first remote call.
    let secrets = load_secrets();
    let store = ClickHouseStore::from_url(secrets.warehouse_url()?)?;
    let provider_client = provider_client(&secrets, &provider)?;
    let settings = load_settings(&recipe)?;
    let config = load_gateway_config(&settings)?;

    eprintln!(
        "{} {} on metric {}",
        "Fine-tuning".bold(),
        settings.function_name()?.cyan(),
        settings.metric_name()?.cyan()
    );

    let cancel = cancellation(provider.max_wait);
    let outcome =
        gatetune_training::run(&store, &provider_client, &config, &settings, &cancel, &ConsoleProgressSink).await;

    match outcome {
        Ok(outcome) => emit_fragments(&outcome, output.as_deref()),
        Err(TrainingError::Cancelled { job_id }) => {
            eprintln!(
                "{} job {} is still running; resume with `gatetune wait {job_id}`",
                "Stopped waiting:".yellow(),
                job_id.cyan()
            );
            Err(TrainingError::Cancelled { job_id }.into())
        }
        Err(e) => Err(e).context("Fine-tuning run failed"),
    }
}

/// Write the fragments to `output`, or stdout.
pub fn emit_fragments(outcome: &RunOutcome, output: Option<&std::path::Path>) -> Result<()> {
    let document = outcome.fragments.to_toml()?;
    eprintln!("{} {}", "Fine-tuned model:".green().bold(), outcome.fragments.model_name);

    match output {
        Some(path) => {
            std::fs::write(path, &document)
                .with_context(|| format!("Failed to write fragments to {}", path.display()))?;
            eprintln!("Config fragments written to {}", path.display().to_string().cyan());
        }
        None => print!("{document}"),
    }
    eprintln!("{}", "New variant has weight 0; merge it into the gateway config by hand.".dimmed());
    Ok(())
}
