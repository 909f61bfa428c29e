use crate::error::TrainingResult;
use crate::job::{FineTuneJob, FineTuneRequest};
use async_trait::async_trait;
use std::path::Path;

/// Purpose string attached to uploaded training data.
pub const FINE_TUNE_PURPOSE: &str = "fine-tune";

/// A hosted fine-tuning service.
#[async_trait]
pub trait FineTuneProvider: Send + Sync {
    /// Provider name used for routing in the emitted gateway config (e.g. `openai`).
    fn id(&self) -> &'static str;

    /// Upload the file at `path` under `file_name` and return the provider's
    /// reference to it. The file must stay in place until the call returns.
    async fn upload_file(&self, file_name: &str, path: &Path, purpose: &str) -> TrainingResult<String>;

    async fn create_job(&self, request: &FineTuneRequest) -> TrainingResult<FineTuneJob>;

    async fn retrieve_job(&self, job_id: &str) -> TrainingResult<FineTuneJob>;
}
