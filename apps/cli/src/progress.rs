use colored::Colorize;
use gatetune_training::{JobStatus, ProgressEvent, ProgressSink};
use tracing::warn;

/// Prints job events to stderr; stdout carries the fragments.
#[derive(Debug, Default)]
pub struct ConsoleProgressSink;

impl ProgressSink for ConsoleProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Uploaded { file_id, records } => {
                eprintln!("{} uploaded {records} records as {}", "[upload]".dimmed(), file_id.cyan());
            }
            ProgressEvent::Submitted { job_id, status } => {
                eprintln!("[job:{}] submitted ({status})", job_id.cyan());
            }
            ProgressEvent::StatusChanged { job_id, from, to } => {
                eprintln!("[job:{}] {from} -> {}", job_id.cyan(), status_label(to));
            }
            ProgressEvent::PollFailed { job_id, message } => {
                warn!(%job_id, error = %message, "Polling failed; will retry");
                eprintln!("[job:{}] {} {message}", job_id.cyan(), "poll failed, retrying:".yellow());
            }
            ProgressEvent::Finished { job_id, status } => {
                eprintln!("[job:{}] finished: {}", job_id.cyan(), status_label(status));
            }
        }
    }
}

pub fn status_label(status: JobStatus) -> colored::ColoredString {
    match status {
        JobStatus::Succeeded => status.to_string().green().bold(),
        JobStatus::Failed | JobStatus::Cancelled => status.to_string().red().bold(),
        JobStatus::ValidatingFiles | JobStatus::Queued | JobStatus::Running => status.to_string().yellow(),
    }
}
