#![allow(dead_code)]

use async_trait::async_trait;
use buildrisk_core::export::{ExportError, ExportResult, ExportSource, RowStream, SourceEstimate};
use buildrisk_core::models::{ExportRow, FeatureValue, IngestionBuild, ResourceKind, ResourceState};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;

/// In-memory export source with a configurable (possibly stale) estimate and
/// an optional mid-stream failure
pub struct StaticSource {
    pub estimate_rows: u64,
    pub columns: Vec<String>,
    pub rows: Vec<ExportRow>,
    pub fail_after: Option<usize>,
}

impl StaticSource {
    pub fn new(columns: Vec<&str>, rows: Vec<ExportRow>) -> Self {
        Self {
            estimate_rows: rows.len() as u64,
            columns: columns.into_iter().map(String::from).collect(),
            rows,
            fail_after: None,
        }
    }

    /// Report a different row count than the stream will actually yield
    pub fn with_estimate(mut self, estimate_rows: u64) -> Self {
        self.estimate_rows = estimate_rows;
        self
    }

    /// Fail the stream after yielding the given number of rows
    pub fn failing_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }
}

#[async_trait]
impl ExportSource for StaticSource {
    async fn estimate(&self, _target: &str) -> ExportResult<SourceEstimate> {
        Ok(SourceEstimate {
            total_rows: self.estimate_rows,
            feature_count: self.columns.len() as u64,
        })
    }

    async fn columns(&self, _target: &str) -> ExportResult<Vec<String>> {
        Ok(self.columns.clone())
    }

    async fn rows(&self, _target: &str) -> ExportResult<RowStream> {
        let mut items: Vec<ExportResult<ExportRow>> = match self.fail_after {
            Some(n) => self.rows.iter().take(n).cloned().map(Ok).collect(),
            None => self.rows.iter().cloned().map(Ok).collect(),
        };
        if self.fail_after.is_some() {
            items.push(Err(ExportError::Source("feature store connection reset".into())));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// A row of simple scalar feature values
pub fn feature_row(repo: &str, score: f64) -> ExportRow {
    ExportRow::new(vec![
        FeatureValue::String(repo.to_string()),
        FeatureValue::Number(score),
    ])
}

pub fn default_resources() -> BTreeSet<ResourceKind> {
    [ResourceKind::Logs, ResourceKind::Diff].into_iter().collect()
}

/// An ingestion build with every required resource still pending
pub fn pending_build(number: u64) -> IngestionBuild {
    IngestionBuild::new(
        1000 + number,
        number,
        format!("sha-{number}"),
        "acme/widgets",
        default_resources(),
    )
}

/// An ingestion build with every required resource stored
pub fn ingested_build(number: u64) -> IngestionBuild {
    let mut build = pending_build(number);
    build.set_resource(ResourceKind::Logs, ResourceState::Ingested, None);
    build.set_resource(ResourceKind::Diff, ResourceState::Ingested, None);
    build
}

/// An ingestion build whose diff is permanently unavailable
pub fn missing_build(number: u64) -> IngestionBuild {
    let mut build = pending_build(number);
    build.set_resource(ResourceKind::Logs, ResourceState::Ingested, None);
    build.set_resource(
        ResourceKind::Diff,
        ResourceState::Missing,
        Some("404 from provider".into()),
    );
    build
}
