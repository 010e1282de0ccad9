use super::errors::{ExportError, ExportResult};
use super::orchestrator::ExportOrchestrator;
use super::source::artifact_filename;
use crate::models::{ExportFormat, ExportJob, ExportJobStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

/// How an export was ultimately delivered
#[derive(Debug)]
pub enum ExportOutcome {
    /// Small export streamed synchronously
    Streamed { filename: String, bytes: Vec<u8> },
    /// Large (or over-ceiling) export generated as a background job
    Downloaded {
        job: ExportJob,
        filename: String,
        bytes: Vec<u8>,
    },
}

impl ExportOutcome {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Streamed { bytes, .. } | Self::Downloaded { bytes, .. } => bytes,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            Self::Streamed { filename, .. } | Self::Downloaded { filename, .. } => filename,
        }
    }
}

/// The client-side export flow: sync-first with transparent job fallback.
///
/// Attempts `export_sync` when the preview does not recommend async; a
/// `SizeExceeded` refusal (the estimate can be stale) falls back to a job
/// without surfacing the error. Jobs are polled at a fixed interval until
/// terminal; dropping the cancellation token stops the poll but never the
/// server-side job.
pub struct ExportClient {
    orchestrator: Arc<ExportOrchestrator>,
    poll_interval: Duration,
}

impl ExportClient {
    pub fn new(orchestrator: Arc<ExportOrchestrator>, poll_interval: Duration) -> Self {
        Self {
            orchestrator,
            poll_interval,
        }
    }

    pub async fn run(
        &self,
        target: &str,
        format: ExportFormat,
        mut cancel: watch::Receiver<bool>,
    ) -> ExportResult<ExportOutcome> {
        let preview = self.orchestrator.preview(target).await?;
        let filename = artifact_filename(target, "dataset", format);

        if !preview.use_async_recommended {
            match self.orchestrator.export_sync(target, format).await {
                Ok(bytes) => return Ok(ExportOutcome::Streamed { filename, bytes }),
                Err(ExportError::SizeExceeded { rendered_bytes, limit_bytes }) => {
                    // Stale estimate; fall back to a job without surfacing the refusal
                    debug!(target, rendered_bytes, limit_bytes, "falling back to async export job");
                }
                Err(other) => return Err(other),
            }
        }

        let job_id = Arc::clone(&self.orchestrator).create_job(target, format).await?;
        let job = self.poll_until_terminal(job_id, &mut cancel).await?;

        match job.status {
            ExportJobStatus::Completed => {
                let bytes = self.orchestrator.download(job_id).await?;
                Ok(ExportOutcome::Downloaded {
                    job,
                    filename,
                    bytes,
                })
            }
            _ => Err(ExportError::JobFailed {
                job_id,
                message: job.error_message.unwrap_or_else(|| "unknown failure".into()),
            }),
        }
    }

    /// Fixed-interval poll loop; stops on a terminal status or cancellation
    async fn poll_until_terminal(
        &self,
        job_id: Uuid,
        cancel: &mut watch::Receiver<bool>,
    ) -> ExportResult<ExportJob> {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    // Err means the sender half was dropped; both stop the poll
                    if changed.is_err() || *cancel.borrow() {
                        return Err(ExportError::PollCancelled);
                    }
                }
                _ = interval.tick() => {
                    let job = self.orchestrator.job_status(job_id).await?;
                    if job.status.is_terminal() {
                        return Ok(job);
                    }
                }
            }
        }
    }
}
