//! Gateway config fragments for a freshly fine-tuned model.
//!
//! The fragments are printed for an operator to merge by hand. The new variant
//! starts with weight 0 so no traffic reaches it until someone opts in.

use crate::config::VariantConfig;
use crate::dataset::Role;
use crate::error::{TrainingError, TrainingResult};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderEntry {
    #[serde(rename = "type")]
    pub provider_type: String,
    pub model_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEntry {
    pub routing: Vec<String>,
    pub providers: BTreeMap<String, ProviderEntry>,
}

/// `[models."<name>"]` section registering the fine-tuned model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFragment {
    pub models: BTreeMap<String, ModelEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantEntry {
    #[serde(rename = "type")]
    pub variant_type: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_template: Option<String>,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionEntry {
    pub variants: BTreeMap<String, VariantEntry>,
}

/// `[functions.<fn>.variants."<name>"]` section using the fine-tuned model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantFragment {
    pub functions: BTreeMap<String, FunctionEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFragments {
    pub model_name: String,
    pub model: ModelFragment,
    pub variant: VariantFragment,
}

impl ConfigFragments {
    /// Build both fragments for `fine_tuned_model`, served through `provider`.
    ///
    /// The new variant is named after the model and carries over the source
    /// variant's template paths unchanged.
    #[must_use]
    pub fn new(
        fine_tuned_model: &str,
        provider: &str,
        function_name: &str,
        source_variant: &VariantConfig,
    ) -> Self {
        let model_entry = ModelEntry {
            routing: vec![provider.to_string()],
            providers: BTreeMap::from([(
                provider.to_string(),
                ProviderEntry {
                    provider_type: provider.to_string(),
                    model_name: fine_tuned_model.to_string(),
                },
            )]),
        };

        let variant_entry = VariantEntry {
            variant_type: "chat_completion".to_string(),
            model: fine_tuned_model.to_string(),
            system_template: source_variant.template_path(Role::System).map(str::to_string),
            user_template: source_variant.template_path(Role::User).map(str::to_string),
            assistant_template: source_variant.template_path(Role::Assistant).map(str::to_string),
            weight: 0.0,
        };

        Self {
            model_name: fine_tuned_model.to_string(),
            model: ModelFragment {
                models: BTreeMap::from([(fine_tuned_model.to_string(), model_entry)]),
            },
            variant: VariantFragment {
                functions: BTreeMap::from([(
                    function_name.to_string(),
                    FunctionEntry {
                        variants: BTreeMap::from([(fine_tuned_model.to_string(), variant_entry)]),
                    },
                )]),
            },
        }
    }

    pub fn model_toml(&self) -> TrainingResult<String> {
        to_toml(&self.model)
    }

    pub fn variant_toml(&self) -> TrainingResult<String> {
        to_toml(&self.variant)
    }

    /// Both fragments as one document, ready to paste into the gateway config.
    pub fn to_toml(&self) -> TrainingResult<String> {
        Ok(format!(
            "# Fine-tuned model {name}. Merge into the gateway config by hand.\n\n{}\n{}",
            self.model_toml()?,
            self.variant_toml()?,
            name = self.model_name,
        ))
    }
}

fn to_toml<T: Serialize>(value: &T) -> TrainingResult<String> {
    toml::to_string_pretty(value)
        .map_err(|e| TrainingError::Other(anyhow::anyhow!("failed to serialize config fragment: {e}")))
}
