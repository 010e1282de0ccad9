use crate::models::ExportJobStatus;
use thiserror::Error;
use uuid::Uuid;

/// Export orchestration errors.
///
/// `SizeExceeded` is the one recoverable case: the client flow falls back to
/// an async job instead of surfacing it.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Rendered payload of {rendered_bytes} bytes exceeds the synchronous export ceiling ({limit_bytes} bytes)")]
    SizeExceeded { rendered_bytes: u64, limit_bytes: u64 },

    #[error("Export job {job_id} failed: {message}")]
    JobFailed { job_id: Uuid, message: String },

    #[error("Export job {job_id} is not ready for download (status '{status}')")]
    JobNotReady {
        job_id: Uuid,
        status: ExportJobStatus,
    },

    #[error("Export job {job_id} not found")]
    JobNotFound { job_id: Uuid },

    #[error("Export source error: {0}")]
    Source(String),

    #[error("Failed to render row: {0}")]
    Render(#[from] serde_json::Error),

    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export polling was cancelled")]
    PollCancelled,
}

pub type ExportResult<T> = Result<T, ExportError>;
