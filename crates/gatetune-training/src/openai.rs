//! OpenAI fine-tuning API client.
//!
//! Covers the three calls the recipe needs: file upload, job creation and job
//! retrieval. The base URL is configurable so OpenAI-compatible services and
//! test servers can stand in for api.openai.com.

use crate::error::{TrainingError, TrainingResult};
use crate::job::{FineTuneJob, FineTuneRequest};
use crate::provider::FineTuneProvider;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, error};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAIFineTuning {
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the OpenAI API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenAIFineTuning {
    #[must_use]
    pub fn with_api_key(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    #[must_use]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn parse_job(response: reqwest::Response, operation: &str) -> TrainingResult<FineTuneJob> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, operation, "OpenAI API returned error status");
            return Err(map_http_error(status, &error_text, operation));
        }
        response.json::<FineTuneJob>().await.map_err(|e| {
            TrainingError::Provider(format!("failed to parse {operation} response: {e}"))
        })
    }
}

#[derive(Debug, Deserialize)]
struct FileObject {
    id: String,
}

#[async_trait]
impl FineTuneProvider for OpenAIFineTuning {
    fn id(&self) -> &'static str {
        "openai"
    }

    async fn upload_file(&self, file_name: &str, path: &Path, purpose: &str) -> TrainingResult<String> {
        let file = tokio::fs::File::open(path).await?;
        let bytes = file.metadata().await?.len();
        debug!(file_name, bytes, purpose, "Uploading file to OpenAI");

        let part = Part::stream_with_length(Body::from(file), bytes)
            .file_name(file_name.to_string())
            .mime_str("application/jsonl")
            .map_err(|e| TrainingError::Provider(format!("failed to set MIME type: {e}")))?;
        let form = Form::new().text("purpose", purpose.to_string()).part("file", part);

        let response = self
            .client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TrainingError::Provider(format!("failed to upload {file_name}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "OpenAI file upload failed");
            return Err(map_http_error(status, &error_text, "file upload"));
        }

        let file: FileObject = response
            .json()
            .await
            .map_err(|e| TrainingError::Provider(format!("failed to parse upload response: {e}")))?;
        debug!(file_id = %file.id, "File uploaded");
        Ok(file.id)
    }

    async fn create_job(&self, request: &FineTuneRequest) -> TrainingResult<FineTuneJob> {
        debug!(model = %request.model, training_file = %request.training_file, "Creating fine-tuning job");

        let response = self
            .client
            .post(format!("{}/fine_tuning/jobs", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| TrainingError::Provider(format!("failed to create job: {e}")))?;

        Self::parse_job(response, "job creation").await
    }

    async fn retrieve_job(&self, job_id: &str) -> TrainingResult<FineTuneJob> {
        let response = self
            .client
            .get(format!("{}/fine_tuning/jobs/{}", self.base_url, job_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| TrainingError::Provider(format!("failed to retrieve job {job_id}: {e}")))?;

        Self::parse_job(response, "job retrieval").await
    }
}

/// Maps HTTP status codes to a provider error with a readable cause.
fn map_http_error(status: StatusCode, error_text: &str, operation: &str) -> TrainingError {
    let message = match status.as_u16() {
        400 => format!("invalid request for {operation}: {error_text}"),
        401 | 403 => format!("authentication failed for {operation}: {error_text}"),
        404 => format!("not found for {operation}: {error_text}"),
        429 => format!("rate limit or quota exceeded for {operation}: {error_text}"),
        500..=599 => format!("server error for {operation} ({status}): {error_text}"),
        _ => format!("unexpected status for {operation} ({status}): {error_text}"),
    };
    TrainingError::Provider(message)
}
