//! Per-variant prompt templates.
//!
//! A variant registers at most one template per role. Structured message
//! content is rendered through the role's template; literal text passes through
//! untouched and never needs one.

use crate::config::{GatewayConfig, VariantConfig};
use crate::dataset::Role;
use crate::error::{TemplateError, TrainingError, TrainingResult};
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

const ROLES: [Role; 3] = [Role::System, Role::User, Role::Assistant];

pub struct TemplateSet {
    env: Environment<'static>,
}

impl fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roles: Vec<_> = ROLES.iter().filter(|r| self.has(**r)).collect();
        f.debug_struct("TemplateSet").field("roles", &roles).finish()
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        Self { env }
    }
}

impl TemplateSet {
    /// Build a set from in-memory template bodies.
    pub fn from_bodies<I, S>(bodies: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (Role, S)>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for (role, body) in bodies {
            set.register(role, body.as_ref())?;
        }
        Ok(set)
    }

    /// Load every template the variant declares, resolving paths against the
    /// config file's directory.
    pub fn load(config: &GatewayConfig, variant: &VariantConfig) -> TrainingResult<Self> {
        let mut set = Self::default();
        for role in ROLES {
            let Some(relative) = variant.template_path(role) else {
                continue;
            };
            let path = config.resolve_path(relative);
            let body = std::fs::read_to_string(&path).map_err(|source| TemplateError::Read {
                role: role.to_string(),
                path: path.display().to_string(),
                source,
            })?;
            debug!(role = %role, path = %path.display(), "Loaded template");
            set.register(role, &body)?;
        }
        Ok(set)
    }

    fn register(&mut self, role: Role, body: &str) -> Result<(), TemplateError> {
        self.env
            .add_template_owned(role.as_str(), body.to_string())
            .map_err(|e| TemplateError::Parse { role: role.to_string(), message: e.to_string() })
    }

    #[must_use]
    pub fn has(&self, role: Role) -> bool {
        self.env.get_template(role.as_str()).is_ok()
    }

    /// Render the `role` template with `bindings`.
    pub fn render(&self, role: Role, bindings: &Map<String, Value>) -> Result<String, TemplateError> {
        let template = self
            .env
            .get_template(role.as_str())
            .map_err(|_| TemplateError::Missing { role: role.to_string() })?;
        template
            .render(bindings)
            .map_err(|e| TemplateError::Render { role: role.to_string(), message: e.to_string() })
    }

    /// Turn a message's content-block list into text.
    ///
    /// The list must hold exactly one `{"type": "text", "value": ...}` block.
    /// A string value is returned as is; an object value is rendered through the
    /// role's template. `context` names the message in error reports.
    pub fn render_content(&self, role: Role, content: &Value, context: &str) -> TrainingResult<String> {
        let blocks = content.as_array().ok_or_else(|| {
            TrainingError::structural(context, format!("content is not a list of blocks: {content}"))
        })?;
        let [block] = blocks.as_slice() else {
            return Err(TrainingError::structural(
                context,
                format!("expected exactly one content block, found {}: {content}", blocks.len()),
            ));
        };
        if block.get("type").and_then(Value::as_str) != Some("text") {
            return Err(TrainingError::structural(
                context,
                format!("content block is not of type `text`: {block}"),
            ));
        }
        match block.get("value") {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(Value::Object(bindings)) => Ok(self.render(role, bindings)?),
            _ => Err(TrainingError::structural(
                context,
                format!("text block value must be a string or an object: {block}"),
            )),
        }
    }
}
