//! Run parameters and secrets.
//!
//! A recipe file (TOML) supplies defaults for a run; the CLI overrides
//! individual fields before handing the settings to the pipeline. Secrets are
//! never read from the environment inside the library.

use crate::error::{TrainingError, TrainingResult};
use crate::job::FineTuneHyperParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_VAL_FRACTION: f64 = 0.2;
pub const DEFAULT_THRESHOLD: f64 = 0.5;
pub const DEFAULT_MAX_SAMPLES: u64 = 100_000;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

pub const WAREHOUSE_URL_VAR: &str = "CLICKHOUSE_URL";
pub const PROVIDER_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Settings for one fine-tuning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecipeSettings {
    /// Gateway config file
    pub gateway_config: Option<PathBuf>,

    pub function_name: Option<String>,
    pub metric_name: Option<String>,

    /// Variant whose templates rebuild the conversations
    pub variant_name: Option<String>,

    /// Base model to fine-tune; falls back to the variant's model
    pub model_name: Option<String>,

    pub val_fraction: f64,
    pub threshold: f64,
    pub max_samples: u64,
    pub seed: u64,
    pub poll_interval_secs: u64,

    /// Suffix the provider appends to the fine-tuned model name
    pub suffix: Option<String>,

    pub hyperparameters: FineTuneHyperParams,
}

impl Default for RecipeSettings {
    fn default() -> Self {
        Self {
            gateway_config: None,
            function_name: None,
            metric_name: None,
            variant_name: None,
            model_name: None,
            val_fraction: DEFAULT_VAL_FRACTION,
            threshold: DEFAULT_THRESHOLD,
            max_samples: DEFAULT_MAX_SAMPLES,
            seed: DEFAULT_SEED,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            suffix: None,
            hyperparameters: FineTuneHyperParams::default(),
        }
    }
}

impl RecipeSettings {
    /// Load a recipe from a TOML file.
    ///
    /// A relative `gateway_config` is resolved against the recipe's directory.
    pub fn load_from_file(path: &Path) -> TrainingResult<Self> {
        if !path.exists() {
            return Err(TrainingError::Config(format!("recipe file not found: {}", path.display())));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| TrainingError::Config(format!("failed to read {}: {}", path.display(), e)))?;

        let mut settings: Self = toml::from_str(&content)
            .map_err(|e| TrainingError::Config(format!("{}: {}", path.display(), e)))?;

        if let (Some(config), Some(dir)) = (&settings.gateway_config, path.parent()) {
            if config.is_relative() {
                settings.gateway_config = Some(dir.join(config));
            }
        }
        Ok(settings)
    }

    pub fn gateway_config(&self) -> TrainingResult<&Path> {
        self.gateway_config
            .as_deref()
            .ok_or_else(|| TrainingError::Config("missing setting `gateway_config`".to_string()))
    }

    pub fn function_name(&self) -> TrainingResult<&str> {
        required(self.function_name.as_ref(), "function_name")
    }

    pub fn metric_name(&self) -> TrainingResult<&str> {
        required(self.metric_name.as_ref(), "metric_name")
    }

    pub fn variant_name(&self) -> TrainingResult<&str> {
        required(self.variant_name.as_ref(), "variant_name")
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Check numeric ranges before anything touches a remote service.
    pub fn validate(&self) -> TrainingResult<()> {
        if !(0.0..1.0).contains(&self.val_fraction) {
            return Err(TrainingError::InvalidSetting(format!(
                "val_fraction must be in [0, 1), got {}",
                self.val_fraction
            )));
        }
        if !self.threshold.is_finite() {
            return Err(TrainingError::InvalidSetting(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if self.max_samples == 0 {
            return Err(TrainingError::InvalidSetting("max_samples must be >= 1".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(TrainingError::InvalidSetting("poll_interval_secs must be >= 1".to_string()));
        }
        if let Some(suffix) = &self.suffix {
            if suffix.is_empty() || suffix.len() > 64 {
                return Err(TrainingError::InvalidSetting(
                    "suffix must be between 1 and 64 characters".to_string(),
                ));
            }
        }
        self.hyperparameters.validate()
    }
}

fn required<'a>(value: Option<&'a String>, key: &str) -> TrainingResult<&'a str> {
    value
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| TrainingError::Config(format!("missing setting `{key}`")))
}

/// Credentials for the remote services.
///
/// Each command needs a different subset, so both are optional here and
/// checked when used.
#[derive(Clone, Default)]
pub struct Secrets {
    warehouse_url: Option<String>,
    provider_api_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("warehouse_url", &self.warehouse_url.as_ref().map(|_| "<redacted>"))
            .field("provider_api_key", &self.provider_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Secrets {
    #[must_use]
    pub fn new(warehouse_url: Option<String>, provider_api_key: Option<String>) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self { warehouse_url: non_empty(warehouse_url), provider_api_key: non_empty(provider_api_key) }
    }

    pub fn warehouse_url(&self) -> TrainingResult<&str> {
        self.warehouse_url.as_deref().ok_or(TrainingError::MissingSecret(WAREHOUSE_URL_VAR))
    }

    pub fn provider_api_key(&self) -> TrainingResult<&str> {
        self.provider_api_key.as_deref().ok_or(TrainingError::MissingSecret(PROVIDER_API_KEY_VAR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = RecipeSettings::default();
        assert_eq!(settings.val_fraction, 0.2);
        assert_eq!(settings.threshold, 0.5);
        assert_eq!(settings.max_samples, 100_000);
        assert_eq!(settings.seed, 42);
        assert_eq!(settings.poll_interval(), Duration::from_secs(10));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_fills_defaults_and_resolves_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gatetune.toml");
        std::fs::write(
            &path,
            r#"
gateway_config = "config/gateway.toml"
function_name = "extract_entities"
metric_name = "exact_match"
variant_name = "gpt_4o_mini"
threshold = 0.9

[hyperparameters]
n_epochs = 3
"#,
        )
        .unwrap();

        let settings = RecipeSettings::load_from_file(&path).unwrap();
        assert_eq!(settings.function_name().unwrap(), "extract_entities");
        assert_eq!(settings.threshold, 0.9);
        assert_eq!(settings.seed, 42);
        assert_eq!(settings.hyperparameters.n_epochs, Some(3));
        assert_eq!(settings.gateway_config().unwrap(), temp.path().join("config/gateway.toml"));
        assert!(settings.model_name.is_none());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gatetune.toml");
        std::fs::write(&path, "treshold = 0.9\n").unwrap();
        let err = RecipeSettings::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("treshold"));
    }

    #[test]
    fn test_missing_required_setting_is_named() {
        let err = RecipeSettings::default().metric_name().unwrap_err();
        assert!(err.to_string().contains("metric_name"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut settings = RecipeSettings { val_fraction: 1.0, ..Default::default() };
        assert!(settings.validate().is_err());
        settings.val_fraction = 0.2;
        settings.max_samples = 0;
        assert!(settings.validate().is_err());
        settings.max_samples = 10;
        settings.poll_interval_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_secrets_name_missing_variable() {
        let secrets = Secrets::new(Some("http://localhost:8123".to_string()), Some("  ".to_string()));
        assert_eq!(secrets.warehouse_url().unwrap(), "http://localhost:8123");
        let err = secrets.provider_api_key().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        assert!(!format!("{secrets:?}").contains("localhost"));
    }
}
