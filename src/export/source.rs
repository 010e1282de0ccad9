use super::errors::ExportResult;
use crate::models::{ExportFormat, ExportRow};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Cheap size estimate for one export target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEstimate {
    pub total_rows: u64,
    pub feature_count: u64,
}

/// Preview returned to clients before an export is started.
///
/// `async_threshold` is surfaced so clients can display it; they never
/// re-derive the recommendation themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPreview {
    pub total_rows: u64,
    pub feature_count: u64,
    pub use_async_recommended: bool,
    pub async_threshold: u64,
}

/// Stream of resolved export rows
pub type RowStream = BoxStream<'static, ExportResult<ExportRow>>;

/// Seam to the feature store backing exports.
///
/// The estimate may be stale relative to the row stream — the orchestrator
/// enforces the sync byte ceiling on actual rendered bytes, never on the
/// estimate.
#[async_trait]
pub trait ExportSource: Send + Sync {
    /// Side-effect-free row/feature count estimate
    async fn estimate(&self, target: &str) -> ExportResult<SourceEstimate>;

    /// Column schema for the target, in render order
    async fn columns(&self, target: &str) -> ExportResult<Vec<String>>;

    /// Open the row stream for the target
    async fn rows(&self, target: &str) -> ExportResult<RowStream>;
}

/// Client-assigned download filename: `{target}_{kind}.{ext}`
pub fn artifact_filename(target: &str, kind: &str, format: ExportFormat) -> String {
    let safe_target: String = target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{safe_target}_{kind}.{}", format.extension())
}
