use crate::job::JobStatus;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Uploaded { file_id: String, records: usize },
    Submitted { job_id: String, status: JobStatus },
    StatusChanged { job_id: String, from: JobStatus, to: JobStatus },
    PollFailed { job_id: String, message: String },
    Finished { job_id: String, status: JobStatus },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Reports progress through `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Uploaded { file_id, records } => info!(%file_id, records, "Uploaded dataset"),
            ProgressEvent::Submitted { job_id, status } => info!(%job_id, %status, "Submitted fine-tuning job"),
            ProgressEvent::StatusChanged { job_id, from, to } => {
                info!(%job_id, %from, %to, "Job status changed");
            }
            ProgressEvent::PollFailed { job_id, message } => {
                warn!(%job_id, error = %message, "Polling failed; will retry");
            }
            ProgressEvent::Finished { job_id, status } => info!(%job_id, %status, "Job finished"),
        }
    }
}
