use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Supported export artifact formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid export format: {s}")),
        }
    }
}

/// Export job lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExportJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ExportJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A background-generated export artifact.
///
/// All mutation goes through the lifecycle methods; `progress_percent` is
/// recomputed by [`ExportJob::record_progress`] and `processed_rows` is
/// monotonically non-decreasing by construction. Terminal states are
/// assigned at most once — later terminal assignments are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: Uuid,
    pub target: String,
    pub format: ExportFormat,
    pub status: ExportJobStatus,
    pub total_rows: u64,
    pub processed_rows: u64,
    pub progress_percent: f64,
    /// Set iff status is `completed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Set iff status is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Set iff status is `completed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExportJob {
    pub fn new(target: impl Into<String>, format: ExportFormat, total_rows: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: target.into(),
            format,
            status: ExportJobStatus::Pending,
            total_rows,
            processed_rows: 0,
            progress_percent: 0.0,
            file_size: None,
            error_message: None,
            download_url: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Flip a pending job to processing
    pub fn begin(&mut self) {
        if self.status == ExportJobStatus::Pending {
            self.status = ExportJobStatus::Processing;
        }
    }

    /// Record absolute progress. Regressions are ignored so observed
    /// `processed_rows` never decreases across polls.
    pub fn record_progress(&mut self, processed_rows: u64) {
        if processed_rows > self.processed_rows {
            self.processed_rows = processed_rows;
        }
        self.progress_percent = Self::percent(self.processed_rows, self.total_rows);
    }

    /// Mark the job completed with its retained artifact
    pub fn complete(&mut self, file_size: u64, download_url: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExportJobStatus::Completed;
        self.file_size = Some(file_size);
        self.download_url = Some(download_url.into());
        self.completed_at = Some(Utc::now());
        self.progress_percent = Self::percent(self.processed_rows, self.total_rows);
    }

    /// Mark the job failed; the message is surfaced verbatim to clients
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExportJobStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn file_size_mb(&self) -> Option<f64> {
        self.file_size
            .map(|bytes| (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0)
    }

    /// `round(processed/total*100, 1)` clamped to [0, 100]; 0 when total is 0
    fn percent(processed: u64, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let raw = processed as f64 / total as f64 * 100.0;
        ((raw * 10.0).round() / 10.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let mut job = ExportJob::new("acme/widgets", ExportFormat::Csv, 200);
        job.begin();
        job.record_progress(50);
        assert_eq!(job.processed_rows, 50);
        assert_eq!(job.progress_percent, 25.0);

        // A stale absolute snapshot never moves progress backwards
        job.record_progress(30);
        assert_eq!(job.processed_rows, 50);

        job.record_progress(500);
        assert_eq!(job.progress_percent, 100.0);
    }

    #[test]
    fn test_percent_rounds_to_one_decimal() {
        let mut job = ExportJob::new("acme/widgets", ExportFormat::Json, 3);
        job.record_progress(1);
        assert_eq!(job.progress_percent, 33.3);
        job.record_progress(2);
        assert_eq!(job.progress_percent, 66.7);
    }

    #[test]
    fn test_zero_total_rows_reports_zero_percent() {
        let mut job = ExportJob::new("acme/widgets", ExportFormat::Csv, 0);
        job.record_progress(0);
        assert_eq!(job.progress_percent, 0.0);
    }

    #[test]
    fn test_terminal_states_assigned_once() {
        let mut job = ExportJob::new("acme/widgets", ExportFormat::Csv, 10);
        job.begin();
        job.fail("stream interrupted");
        assert_eq!(job.status, ExportJobStatus::Failed);

        job.complete(1024, "/exports/late");
        assert_eq!(job.status, ExportJobStatus::Failed);
        assert!(job.download_url.is_none());
        assert_eq!(job.error_message.as_deref(), Some("stream interrupted"));
    }

    #[test]
    fn test_file_size_mb() {
        let mut job = ExportJob::new("acme/widgets", ExportFormat::Csv, 1);
        job.begin();
        job.record_progress(1);
        job.complete(3 * 1024 * 1024 + 512 * 1024, "/exports/x.csv");
        assert_eq!(job.file_size_mb(), Some(3.5));
    }
}
