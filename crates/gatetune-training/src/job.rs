use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a remote fine-tuning job.
///
/// `validating_files -> queued -> running -> {succeeded | failed | cancelled}`.
/// Providers may skip intermediate states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    ValidatingFiles,
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    fn stage(self) -> u8 {
        match self {
            Self::ValidatingFiles => 0,
            Self::Queued => 1,
            Self::Running => 2,
            Self::Succeeded | Self::Failed | Self::Cancelled => 3,
        }
    }

    /// Whether moving from `self` to `next` goes forward in the lifecycle.
    #[must_use]
    pub fn precedes(self, next: Self) -> bool {
        self.stage() < next.stage()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ValidatingFiles => "validating_files",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A fine-tuning job as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineTuneJob {
    pub id: String,
    pub model: String,
    pub status: JobStatus,
    pub training_file: String,
    #[serde(default)]
    pub validation_file: Option<String>,
    #[serde(default)]
    pub fine_tuned_model: Option<String>,
    #[serde(default)]
    pub error: Option<JobError>,
}

impl FineTuneJob {
    /// Model id produced by a succeeded job.
    pub fn fine_tuned_model(&self) -> TrainingResult<&str> {
        if self.status != JobStatus::Succeeded {
            return Err(TrainingError::JobFailed {
                job_id: self.id.clone(),
                status: self.status,
                message: self.error_message(),
            });
        }
        self.fine_tuned_model.as_deref().ok_or_else(|| {
            TrainingError::Provider(format!("job {} succeeded without a fine_tuned_model", self.id))
        })
    }

    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().and_then(|e| e.message.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FineTuneHyperParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_epochs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_rate_multiplier: Option<f64>,
}

impl FineTuneHyperParams {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_epochs.is_none() && self.batch_size.is_none() && self.learning_rate_multiplier.is_none()
    }

    pub fn validate(&self) -> TrainingResult<()> {
        if self.n_epochs == Some(0) {
            return Err(TrainingError::InvalidSetting("n_epochs must be >= 1".to_string()));
        }
        if self.batch_size == Some(0) {
            return Err(TrainingError::InvalidSetting("batch_size must be >= 1".to_string()));
        }
        if let Some(lr) = self.learning_rate_multiplier {
            if !lr.is_finite() || lr <= 0.0 {
                return Err(TrainingError::InvalidSetting(
                    "learning_rate_multiplier must be > 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Body of a job creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FineTuneRequest {
    pub training_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_file: Option<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "FineTuneHyperParams::is_empty")]
    pub hyperparameters: FineTuneHyperParams,
}

impl FineTuneRequest {
    pub fn validate(&self) -> TrainingResult<()> {
        if self.model.trim().is_empty() {
            return Err(TrainingError::InvalidSetting("model name is required".to_string()));
        }
        if self.training_file.trim().is_empty() {
            return Err(TrainingError::InvalidSetting("training file reference is required".to_string()));
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::ValidatingFiles.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_lifecycle_ordering() {
        assert!(JobStatus::ValidatingFiles.precedes(JobStatus::Running));
        assert!(JobStatus::Queued.precedes(JobStatus::Running));
        assert!(JobStatus::Running.precedes(JobStatus::Failed));
        assert!(!JobStatus::Running.precedes(JobStatus::Queued));
        assert!(!JobStatus::Succeeded.precedes(JobStatus::Cancelled));
    }

    #[test]
    fn test_status_wire_names() {
        let status: JobStatus = serde_json::from_str(r#""validating_files""#).unwrap();
        assert_eq!(status, JobStatus::ValidatingFiles);
        assert_eq!(JobStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_fine_tuned_model_requires_success() {
        let job: FineTuneJob = serde_json::from_str(
            r#"{"id":"ftjob-1","model":"gpt-4o-mini","status":"failed","training_file":"file-1",
                "error":{"code":"invalid_file","message":"bad line 3"}}"#,
        )
        .unwrap();
        let err = job.fine_tuned_model().unwrap_err();
        assert!(err.to_string().contains("bad line 3"));
    }

    #[test]
    fn test_request_omits_empty_fields() {
        let request = FineTuneRequest {
            training_file: "file-1".to_string(),
            validation_file: None,
            model: "gpt-4o-mini".to_string(),
            suffix: None,
            hyperparameters: FineTuneHyperParams::default(),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, serde_json::json!({"training_file": "file-1", "model": "gpt-4o-mini"}));
    }

    #[test]
    fn test_request_validation() {
        let mut request = FineTuneRequest {
            training_file: "file-1".to_string(),
            validation_file: Some("file-2".to_string()),
            model: " ".to_string(),
            suffix: None,
            hyperparameters: FineTuneHyperParams::default(),
        };
        assert!(request.validate().is_err());

        request.model = "gpt-4o-mini".to_string();
        request.hyperparameters.n_epochs = Some(0);
        assert!(request.validate().is_err());

        request.hyperparameters.n_epochs = Some(3);
        request.hyperparameters.learning_rate_multiplier = Some(f64::NAN);
        assert!(request.validate().is_err());

        request.hyperparameters.learning_rate_multiplier = Some(0.5);
        assert!(request.validate().is_ok());
    }
}
