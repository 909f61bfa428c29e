//! `gatetune status`: one snapshot of a fine-tuning job.

use crate::commands::types::ProviderArgs;
use crate::config::{load_secrets, provider_client};
use crate::progress::status_label;
use anyhow::{Context, Result};
use colored::Colorize;
use gatetune_training::FineTuneProvider;

pub async fn execute(job_id: String, provider: ProviderArgs, json_output: bool) -> Result<()> {
    let secrets = load_secrets();
    let client = provider_client(&secrets, &provider)?;
    let job = client.retrieve_job(&job_id).await.with_context(|| format!("Failed to fetch job {job_id}"))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    println!();
    println!("{} {}", "Job".bold(), job.id.cyan());
    println!("  Status:           {}", status_label(job.status));
    println!("  Base model:       {}", job.model);
    println!("  Training file:    {}", job.training_file);
    println!("  Validation file:  {}", job.validation_file.as_deref().unwrap_or("-").dimmed());
    if let Some(model) = &job.fine_tuned_model {
        println!("  Fine-tuned model: {}", model.green());
    }
    if let Some(message) = job.error_message() {
        println!("  Error:            {}", message.red());
    }
    println!();
    Ok(())
}
