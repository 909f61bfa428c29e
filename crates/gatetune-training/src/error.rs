use crate::job::JobStatus;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing required environment variable `{0}`")]
    MissingSecret(&'static str),

    #[error("unsupported {kind}: `{value}`")]
    Unsupported { kind: &'static str, value: String },

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("malformed {context}: {message}")]
    Structural { context: String, message: String },

    #[error("no samples of function `{function_name}` pass metric `{metric_name}`")]
    NoSamples { function_name: String, metric_name: String },

    #[error("warehouse error: {0}")]
    Store(String),

    #[error("fine-tuning provider error: {0}")]
    Provider(String),

    #[error("fine-tuning job {job_id} finished with status `{status}`{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    JobFailed { job_id: String, status: JobStatus, message: Option<String> },

    #[error("stopped waiting on fine-tuning job {job_id}; the remote job is unaffected")]
    Cancelled { job_id: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrainingError {
    pub(crate) fn structural(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structural { context: context.into(), message: message.into() }
    }

    pub(crate) fn unsupported(kind: &'static str, value: impl Into<String>) -> Self {
        Self::Unsupported { kind, value: value.into() }
    }
}

/// Errors raised by the template renderer.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("no {role} template is registered for this variant")]
    Missing { role: String },

    #[error("failed to read {role} template {path}: {source}")]
    Read {
        role: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {role} template: {message}")]
    Parse { role: String, message: String },

    #[error("failed to render {role} template: {message}")]
    Render { role: String, message: String },
}
