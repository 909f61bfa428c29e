//! Gateway configuration consumed by the recipe.
//!
//! Only the parts of the gateway's TOML config the recipe needs are modeled:
//! `[metrics.<name>]` and `[functions.<name>.variants.<name>]`. Every other key
//! is ignored. Type-like fields are kept as strings here and converted into
//! closed enums on access, so an unsupported value fails with its name instead
//! of failing the whole file.

use crate::dataset::Role;
use crate::error::{TrainingError, TrainingResult};
use crate::metric::MetricDefinition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Output type of a gateway function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionType {
    Chat,
    Json,
}

impl FromStr for FunctionType {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Self::Chat),
            "json" => Ok(Self::Json),
            other => Err(TrainingError::unsupported("function type", other)),
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => f.write_str("chat"),
            Self::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricConfig {
    #[serde(rename = "type")]
    pub metric_type: String,
    pub level: String,
    pub optimize: String,
}

impl MetricConfig {
    pub fn definition(&self) -> TrainingResult<MetricDefinition> {
        Ok(MetricDefinition {
            metric_type: self.metric_type.parse()?,
            level: self.level.parse()?,
            optimize: self.optimize.parse()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionConfig {
    #[serde(rename = "type")]
    pub function_type: String,
    #[serde(default)]
    pub variants: BTreeMap<String, VariantConfig>,
}

impl FunctionConfig {
    pub fn function_type(&self) -> TrainingResult<FunctionType> {
        self.function_type.parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantConfig {
    #[serde(rename = "type")]
    pub variant_type: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_template: Option<String>,
    #[serde(default)]
    pub user_template: Option<String>,
    #[serde(default)]
    pub assistant_template: Option<String>,
}

impl VariantConfig {
    /// Template path for `role` exactly as written in the config.
    #[must_use]
    pub fn template_path(&self, role: Role) -> Option<&str> {
        match role {
            Role::System => self.system_template.as_deref(),
            Role::User => self.user_template.as_deref(),
            Role::Assistant => self.assistant_template.as_deref(),
        }
    }
}

/// Parsed gateway configuration plus the directory template paths are relative to.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricConfig>,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionConfig>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl GatewayConfig {
    pub fn load_from_file(path: &Path) -> TrainingResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TrainingError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_toml_str(&content, base_dir)
            .map_err(|e| TrainingError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str, base_dir: PathBuf) -> TrainingResult<Self> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| TrainingError::Config(e.to_string()))?;
        config.base_dir = base_dir;
        Ok(config)
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn function(&self, name: &str) -> TrainingResult<&FunctionConfig> {
        self.functions
            .get(name)
            .ok_or_else(|| TrainingError::Config(format!("no [functions.{name}] section")))
    }

    pub fn variant(&self, function_name: &str, variant_name: &str) -> TrainingResult<&VariantConfig> {
        self.function(function_name)?.variants.get(variant_name).ok_or_else(|| {
            TrainingError::Config(format!(
                "no [functions.{function_name}.variants.{variant_name}] section"
            ))
        })
    }

    pub fn metric(&self, name: &str) -> TrainingResult<MetricDefinition> {
        self.metrics
            .get(name)
            .ok_or_else(|| TrainingError::Config(format!("no [metrics.{name}] section")))?
            .definition()
    }

    /// Resolve a template path from the config against the config's directory.
    #[must_use]
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MetricLevel, MetricType, Optimize};

    const CONFIG: &str = r#"
[gateway]
bind_address = "0.0.0.0:3000"

[metrics.exact_match]
type = "boolean"
level = "inference"
optimize = "max"

[metrics.latency]
type = "float"
level = "episode"
optimize = "min"

[metrics.vibes]
type = "ordinal"
level = "inference"
optimize = "max"

[functions.extract_entities]
type = "json"
output_schema = "functions/extract_entities/output_schema.json"

[functions.extract_entities.variants.gpt_4o_mini]
type = "chat_completion"
model = "gpt-4o-mini-2024-07-18"
weight = 1.0
system_template = "functions/extract_entities/system.minijinja"
json_mode = "strict"

[functions.tool_use]
type = "agentic"
"#;

    fn config() -> GatewayConfig {
        GatewayConfig::from_toml_str(CONFIG, PathBuf::from("/etc/gateway")).unwrap()
    }

    #[test]
    fn test_metric_definition_resolves() {
        let cfg = config();
        let m = cfg.metric("exact_match").unwrap();
        assert_eq!(m.metric_type, MetricType::Boolean);
        assert_eq!(m.level, MetricLevel::Inference);
        assert_eq!(m.optimize, Optimize::Max);

        let m = cfg.metric("latency").unwrap();
        assert_eq!(m.level, MetricLevel::Episode);
        assert_eq!(m.optimize, Optimize::Min);
    }

    #[test]
    fn test_unsupported_metric_type_names_value() {
        let err = config().metric("vibes").unwrap_err();
        assert!(matches!(err, TrainingError::Unsupported { kind: "metric type", .. }));
        assert!(err.to_string().contains("ordinal"));
    }

    #[test]
    fn test_missing_sections_are_config_errors() {
        let cfg = config();
        assert!(matches!(cfg.metric("nope"), Err(TrainingError::Config(_))));
        assert!(matches!(cfg.function("nope"), Err(TrainingError::Config(_))));
        let err = cfg.variant("extract_entities", "nope").unwrap_err();
        assert!(err.to_string().contains("functions.extract_entities.variants.nope"));
    }

    #[test]
    fn test_function_type_and_variant_templates() {
        let cfg = config();
        let function = cfg.function("extract_entities").unwrap();
        assert_eq!(function.function_type().unwrap(), FunctionType::Json);

        let variant = cfg.variant("extract_entities", "gpt_4o_mini").unwrap();
        assert_eq!(
            variant.template_path(Role::System),
            Some("functions/extract_entities/system.minijinja")
        );
        assert_eq!(variant.template_path(Role::User), None);
        assert_eq!(
            cfg.resolve_path("functions/x.minijinja"),
            PathBuf::from("/etc/gateway/functions/x.minijinja")
        );
    }

    #[test]
    fn test_unsupported_function_type_is_reported_on_access() {
        let cfg = config();
        let err = cfg.function("tool_use").unwrap().function_type().unwrap_err();
        assert!(err.to_string().contains("unsupported function type: `agentic`"));
    }

    #[test]
    fn test_load_from_file_records_base_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("tensorzero.toml");
        std::fs::write(&path, CONFIG).unwrap();

        let cfg = GatewayConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.base_dir(), temp.path());
    }
}
