//! `gatetune prepare`: build the dataset locally without fine-tuning.

use crate::commands::types::RecipeArgs;
use crate::config::{load_gateway_config, load_secrets, load_settings};
use anyhow::{Context, Result};
use colored::Colorize;
use gatetune_training::{ClickHouseStore, DatasetLayout, prepare_dataset, write_dataset};
use std::path::PathBuf;

pub async fn execute(recipe: RecipeArgs, output_dir: PathBuf, json_output: bool) -> Result<()> {
    let secrets = load_secrets();
    let store = ClickHouseStore::from_url(secrets.warehouse_url()?)?;
    let settings = load_settings(&recipe)?;
    let config = load_gateway_config(&settings)?;

    let split = prepare_dataset(&store, &config, &settings).await.context("Failed to prepare dataset")?;
    let layout = DatasetLayout::new(output_dir);
    let manifest = write_dataset(&layout, &split, &settings)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    println!();
    println!("{}", "Dataset prepared".bold().cyan());
    println!();
    println!("  Dataset id:  {}", manifest.dataset_id.to_string().dimmed());
    for artifact in &manifest.artifacts {
        println!(
            "  {:<12} {} records from {} episodes -> {}",
            format!("{:?}", artifact.kind),
            artifact.records,
            artifact.episodes,
            artifact.path.display().to_string().cyan()
        );
    }
    println!(
        "  Validation:  {:.3} realized (requested {:.3})",
        manifest.realized_val_fraction, manifest.val_fraction
    );
    if split.validation.is_empty() {
        println!("  {}", "Validation set is empty; a run would submit without one.".yellow());
    }
    println!();
    Ok(())
}
