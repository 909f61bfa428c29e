//! Recipe loading and merging.

use crate::commands::types::{ProviderArgs, RecipeArgs};
use anyhow::{Context, Result};
use gatetune_training::settings::{PROVIDER_API_KEY_VAR, WAREHOUSE_URL_VAR};
use gatetune_training::{GatewayConfig, OpenAIFineTuning, RecipeSettings, Secrets};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_RECIPE_FILE: &str = "gatetune.toml";
pub const PROVIDER_URL_VAR: &str = "OPENAI_BASE_URL";

/// Load run settings.
///
/// Precedence:
/// 1. CLI arguments
/// 2. Recipe file (`--recipe`, else ./gatetune.toml if it exists)
/// 3. Defaults
pub fn load_settings(args: &RecipeArgs) -> Result<RecipeSettings> {
    let mut settings = match recipe_path(args.recipe.as_deref()) {
        Some(path) => {
            debug!(path = %path.display(), "Loading recipe");
            RecipeSettings::load_from_file(&path)?
        }
        None => RecipeSettings::default(),
    };
    apply_overrides(&mut settings, args);
    settings.validate()?;
    Ok(settings)
}

fn recipe_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(DEFAULT_RECIPE_FILE);
    local.exists().then_some(local)
}

fn apply_overrides(settings: &mut RecipeSettings, args: &RecipeArgs) {
    if let Some(config) = &args.config {
        settings.gateway_config = Some(config.clone());
    }
    override_opt(&mut settings.function_name, &args.function);
    override_opt(&mut settings.metric_name, &args.metric);
    override_opt(&mut settings.variant_name, &args.variant);
    override_opt(&mut settings.model_name, &args.model);
    override_opt(&mut settings.suffix, &args.suffix);
    if let Some(threshold) = args.threshold {
        settings.threshold = threshold;
    }
    if let Some(val_fraction) = args.val_fraction {
        settings.val_fraction = val_fraction;
    }
    if let Some(max_samples) = args.max_samples {
        settings.max_samples = max_samples;
    }
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if let Some(poll_interval) = args.poll_interval {
        settings.poll_interval_secs = poll_interval;
    }
    if let Some(n_epochs) = args.n_epochs {
        settings.hyperparameters.n_epochs = Some(n_epochs);
    }
}

fn override_opt(target: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

pub fn load_gateway_config(settings: &RecipeSettings) -> Result<GatewayConfig> {
    let path = settings.gateway_config()?;
    GatewayConfig::load_from_file(path)
        .with_context(|| format!("Failed to load gateway config {}", path.display()))
}

/// Read the secrets once, at startup.
pub fn load_secrets() -> Secrets {
    Secrets::new(std::env::var(WAREHOUSE_URL_VAR).ok(), std::env::var(PROVIDER_API_KEY_VAR).ok())
}

pub fn provider_client(secrets: &Secrets, args: &ProviderArgs) -> Result<OpenAIFineTuning> {
    let api_key = secrets.provider_api_key()?.to_string();
    let base_url = args.provider_url.clone().or_else(|| std::env::var(PROVIDER_URL_VAR).ok());
    Ok(match base_url {
        Some(url) => OpenAIFineTuning::with_base_url(api_key, url),
        None => OpenAIFineTuning::with_api_key(api_key),
    })
}

/// Token cancelled on Ctrl-C or once `max_wait` has elapsed.
pub fn cancellation(max_wait: Option<u64>) -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        let deadline = async {
            match max_wait {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    return;
                }
                warn!("Interrupted; stopping the local wait");
            }
            () = deadline => warn!("Maximum wait elapsed; stopping the local wait"),
            () = trigger.cancelled() => return,
        }
        trigger.cancel();
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_recipe() {
        let temp = tempfile::TempDir::new().unwrap();
        let recipe = temp.path().join("recipe.toml");
        std::fs::write(&recipe, "function_name = \"from_recipe\"\nmetric_name = \"m\"\nseed = 7\n").unwrap();

        let args = RecipeArgs {
            recipe: Some(recipe),
            function: Some("from_cli".to_string()),
            threshold: Some(0.8),
            ..Default::default()
        };
        let settings = load_settings(&args).unwrap();

        assert_eq!(settings.function_name.as_deref(), Some("from_cli"));
        assert_eq!(settings.metric_name.as_deref(), Some("m"));
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.threshold, 0.8);
        assert_eq!(settings.val_fraction, 0.2);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = RecipeArgs {
            recipe: Some(PathBuf::from("/nonexistent/gatetune.toml")),
            ..Default::default()
        };
        assert!(load_settings(&args).is_err());

        let temp = tempfile::TempDir::new().unwrap();
        let recipe = temp.path().join("recipe.toml");
        std::fs::write(&recipe, "").unwrap();
        let args = RecipeArgs { recipe: Some(recipe), val_fraction: Some(1.0), ..Default::default() };
        assert!(load_settings(&args).is_err());
    }
}
