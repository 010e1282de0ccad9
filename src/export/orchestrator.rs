use super::errors::{ExportError, ExportResult};
use super::render::Renderer;
use super::source::{ExportPreview, ExportSource};
use crate::config::ExportConfig;
use crate::constants::events;
use crate::logging::log_export_job;
use crate::models::{ExportFormat, ExportJob, ExportJobStatus};
use dashmap::DashMap;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Decides streaming vs. background-job export, owns the job registry, and
/// retains completed artifacts until explicit cleanup.
///
/// Job state lives in a concurrent map written by spawned runner tasks and
/// snapshot-read by pollers; runner writes never hold a map entry across an
/// await.
pub struct ExportOrchestrator {
    config: ExportConfig,
    source: Arc<dyn ExportSource>,
    jobs: DashMap<Uuid, ExportJob>,
    artifact_dir: PathBuf,
}

impl ExportOrchestrator {
    pub fn new(config: ExportConfig, source: Arc<dyn ExportSource>) -> Self {
        let artifact_dir = PathBuf::from(&config.artifact_dir);
        Self {
            config,
            source,
            jobs: DashMap::new(),
            artifact_dir,
        }
    }

    /// Cheap, side-effect-free size classification for one target
    pub async fn preview(&self, target: &str) -> ExportResult<ExportPreview> {
        let estimate = self.source.estimate(target).await?;
        let threshold = self.config.async_threshold_rows;
        Ok(ExportPreview {
            total_rows: estimate.total_rows,
            feature_count: estimate.feature_count,
            use_async_recommended: estimate.total_rows > threshold,
            async_threshold: threshold,
        })
    }

    /// Synchronous full-content export.
    ///
    /// The hard byte ceiling is enforced on actual rendered bytes — the
    /// preview estimate can be stale — and the refusal is recoverable: the
    /// caller falls back to [`ExportOrchestrator::create_job`].
    pub async fn export_sync(&self, target: &str, format: ExportFormat) -> ExportResult<Vec<u8>> {
        let limit = self.config.sync_byte_ceiling;
        let columns = self.source.columns(target).await?;
        let mut renderer = Renderer::new(format, columns);

        let mut payload = renderer.header().into_bytes();
        let mut stream = self.source.rows(target).await?;
        while let Some(row) = stream.next().await {
            let chunk = renderer.row(&row?)?;
            payload.extend_from_slice(chunk.as_bytes());
            if payload.len() as u64 > limit {
                debug!(target, rendered = payload.len(), limit, "sync export over ceiling");
                return Err(ExportError::SizeExceeded {
                    rendered_bytes: payload.len() as u64,
                    limit_bytes: limit,
                });
            }
        }
        payload.extend_from_slice(renderer.footer().as_bytes());

        if payload.len() as u64 > limit {
            return Err(ExportError::SizeExceeded {
                rendered_bytes: payload.len() as u64,
                limit_bytes: limit,
            });
        }
        Ok(payload)
    }

    /// Register a pending job and spawn its generation task; returns the job
    /// id immediately
    pub async fn create_job(self: Arc<Self>, target: &str, format: ExportFormat) -> ExportResult<Uuid> {
        let estimate = self.source.estimate(target).await?;
        let job = ExportJob::new(target, format, estimate.total_rows);
        let job_id = job.id;
        log_export_job(job_id, events::EXPORT_JOB_CREATED, 0, job.total_rows, None);
        self.jobs.insert(job_id, job);

        let orchestrator = self;
        let target = target.to_string();
        tokio::spawn(async move {
            orchestrator.run_job(job_id, &target, format).await;
        });

        Ok(job_id)
    }

    /// Idempotent snapshot read of one job, no side effects
    pub async fn job_status(&self, job_id: Uuid) -> ExportResult<ExportJob> {
        self.jobs
            .get(&job_id)
            .map(|entry| entry.value().clone())
            .ok_or(ExportError::JobNotFound { job_id })
    }

    /// Read a completed job's retained artifact
    pub async fn download(&self, job_id: Uuid) -> ExportResult<Vec<u8>> {
        let job = self.job_status(job_id).await?;
        if job.status != ExportJobStatus::Completed {
            return Err(ExportError::JobNotReady {
                job_id,
                status: job.status,
            });
        }
        Ok(tokio::fs::read(self.artifact_path(&job)).await?)
    }

    /// All known jobs, newest first, so a detached client can rediscover a
    /// still-running job
    pub async fn list_jobs(&self) -> Vec<ExportJob> {
        let mut jobs: Vec<ExportJob> = self.jobs.iter().map(|e| e.value().clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        jobs
    }

    /// Drop the job record and delete its artifact
    pub async fn cleanup_job(&self, job_id: Uuid) -> ExportResult<()> {
        let (_, job) = self
            .jobs
            .remove(&job_id)
            .ok_or(ExportError::JobNotFound { job_id })?;
        match tokio::fs::remove_file(self.artifact_path(&job)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn run_job(&self, job_id: Uuid, target: &str, format: ExportFormat) {
        if let Err(err) = self.generate_artifact(job_id, target, format).await {
            let message = err.to_string();
            error!(%job_id, target, error = %message, "export job failed");
            if let Some(mut job) = self.jobs.get_mut(&job_id) {
                job.fail(message);
                log_export_job(job_id, events::EXPORT_JOB_FAILED, job.processed_rows, job.total_rows, job.error_message.as_deref());
            }
        }
    }

    async fn generate_artifact(
        &self,
        job_id: Uuid,
        target: &str,
        format: ExportFormat,
    ) -> ExportResult<()> {
        if let Some(mut job) = self.jobs.get_mut(&job_id) {
            job.begin();
        }

        let columns = self.source.columns(target).await?;
        let mut renderer = Renderer::new(format, columns);

        tokio::fs::create_dir_all(&self.artifact_dir).await?;
        let path = self.artifact_dir.join(format!("{job_id}.{}", format.extension()));
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(renderer.header().as_bytes()).await?;

        let mut stream = self.source.rows(target).await?;
        let mut processed: u64 = 0;
        while let Some(row) = stream.next().await {
            let chunk = renderer.row(&row?)?;
            file.write_all(chunk.as_bytes()).await?;
            processed += 1;
            if let Some(mut job) = self.jobs.get_mut(&job_id) {
                job.record_progress(processed);
            }
        }

        file.write_all(renderer.footer().as_bytes()).await?;
        file.flush().await?;
        let file_size = tokio::fs::metadata(&path).await?.len();

        if let Some(mut job) = self.jobs.get_mut(&job_id) {
            // Actual row count corrects a stale estimate before completion
            job.total_rows = processed;
            job.record_progress(processed);
            job.complete(file_size, format!("/export/jobs/{job_id}/download"));
            log_export_job(job_id, events::EXPORT_JOB_COMPLETED, job.processed_rows, job.total_rows, None);
        }
        info!(%job_id, target, file_size, "export artifact retained");
        Ok(())
    }

    fn artifact_path(&self, job: &ExportJob) -> PathBuf {
        self.artifact_dir
            .join(format!("{}.{}", job.id, job.format.extension()))
    }
}
