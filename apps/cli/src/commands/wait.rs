//! `gatetune wait`: resume waiting on a submitted job.

use crate::commands::run::emit_fragments;
use crate::commands::types::{ProviderArgs, RecipeArgs};
use crate::config::{cancellation, load_gateway_config, load_secrets, load_settings, provider_client};
use crate::progress::ConsoleProgressSink;
use anyhow::{Context, Result};
use std::path::PathBuf;

pub async fn execute(
    job_id: String,
    recipe: RecipeArgs,
    provider: ProviderArgs,
    output: Option<PathBuf>,
) -> Result<()> {
    let secrets = load_secrets();
    let provider_client = provider_client(&secrets, &provider)?;
    let settings = load_settings(&recipe)?;
    let config = load_gateway_config(&settings)?;

    let cancel = cancellation(provider.max_wait);
    let outcome =
        gatetune_training::resume(&provider_client, &config, &settings, &job_id, &cancel, &ConsoleProgressSink)
            .await
            .with_context(|| format!("Waiting on job {job_id} failed"))?;

    emit_fragments(&outcome, output.as_deref())
}
