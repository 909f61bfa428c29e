//! Fine-tuning job lifecycle: upload, submit, wait, emit config.

use crate::config::VariantConfig;
use crate::dataset::{Conversation, compute_dataset_id};
use crate::error::{TrainingError, TrainingResult};
use crate::fragment::ConfigFragments;
use crate::job::{FineTuneJob, FineTuneRequest, JobStatus};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::provider::{FINE_TUNE_PURPOSE, FineTuneProvider};
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

pub struct Orchestrator<'a> {
    provider: &'a dyn FineTuneProvider,
    progress: &'a dyn ProgressSink,
}

impl<'a> Orchestrator<'a> {
    pub fn new(provider: &'a dyn FineTuneProvider, progress: &'a dyn ProgressSink) -> Self {
        Self { provider, progress }
    }

    /// Upload conversations as a JSONL file and return the provider's file id.
    ///
    /// Records are staged in a temporary file that lives for the whole upload
    /// and is removed when this call returns, whether or not it succeeded.
    pub async fn upload(&self, name: &str, conversations: &[Conversation]) -> TrainingResult<String> {
        if conversations.is_empty() {
            return Err(TrainingError::InvalidSetting(format!("refusing to upload empty {name} dataset")));
        }

        let dataset_id = compute_dataset_id(conversations)?;
        let file_name = format!("{name}-{}.jsonl", &dataset_id.0[..12]);

        let mut staged = tempfile::NamedTempFile::new()?;
        {
            let mut writer = std::io::BufWriter::new(staged.as_file_mut());
            for conversation in conversations {
                serde_json::to_writer(&mut writer, conversation)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }

        debug!(%file_name, records = conversations.len(), path = %staged.path().display(), "Staged upload");
        let file_id = self.provider.upload_file(&file_name, staged.path(), FINE_TUNE_PURPOSE).await?;
        drop(staged);
        self.progress.on_event(ProgressEvent::Uploaded {
            file_id: file_id.clone(),
            records: conversations.len(),
        });
        Ok(file_id)
    }

    pub async fn submit(&self, request: &FineTuneRequest) -> TrainingResult<FineTuneJob> {
        request.validate()?;
        let job = self.provider.create_job(request).await?;
        self.progress.on_event(ProgressEvent::Submitted { job_id: job.id.clone(), status: job.status });
        Ok(job)
    }

    /// Poll `job_id` every `poll_interval` until the job reaches a terminal status.
    ///
    /// Errors while polling are reported and the wait continues. There is no
    /// deadline: the wait ends only on a terminal status or when `cancel` fires,
    /// in which case `TrainingError::Cancelled` is returned and the remote job
    /// keeps running.
    pub async fn await_terminal(
        &self,
        job_id: &str,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> TrainingResult<FineTuneJob> {
        let cancelled = || TrainingError::Cancelled { job_id: job_id.to_string() };
        let mut last: Option<JobStatus> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }

            let polled = tokio::select! {
                () = cancel.cancelled() => return Err(cancelled()),
                result = self.provider.retrieve_job(job_id) => result,
            };

            match polled {
                Ok(job) => {
                    if let Some(previous) = last.filter(|s| *s != job.status) {
                        if !previous.precedes(job.status) {
                            warn!(%job_id, from = %previous, to = %job.status, "Job status moved backwards");
                        }
                        self.progress.on_event(ProgressEvent::StatusChanged {
                            job_id: job_id.to_string(),
                            from: previous,
                            to: job.status,
                        });
                    }
                    last = Some(job.status);

                    if job.status.is_terminal() {
                        self.progress.on_event(ProgressEvent::Finished {
                            job_id: job_id.to_string(),
                            status: job.status,
                        });
                        return Ok(job);
                    }
                    debug!(%job_id, status = %job.status, "Job not finished yet");
                }
                Err(e) => {
                    self.progress.on_event(ProgressEvent::PollFailed {
                        job_id: job_id.to_string(),
                        message: e.to_string(),
                    });
                }
            }

            tokio::select! {
                () = cancel.cancelled() => return Err(cancelled()),
                () = tokio::time::sleep(poll_interval) => {}
            }
        }
    }

    /// Config fragments for a succeeded job.
    pub fn fragments_for(
        &self,
        job: &FineTuneJob,
        function_name: &str,
        source_variant: &VariantConfig,
    ) -> TrainingResult<ConfigFragments> {
        let model = job.fine_tuned_model()?;
        info!(job_id = %job.id, fine_tuned_model = model, "Fine-tuning succeeded");
        Ok(ConfigFragments::new(model, self.provider.id(), function_name, source_variant))
    }
}
