//! # Data Model
//!
//! Entities owned by the pipeline and export services: scenarios, per-build
//! ingestion/extraction records, resumability checkpoints, export jobs, and
//! the feature value union consumed by renderers.

pub mod build;
pub mod checkpoint;
pub mod export_job;
pub mod feature;
pub mod scenario;

pub use build::{
    EnrichmentBuild, ExtractionStatus, IngestionBuild, IngestionStatus, ResourceEntry,
    ResourceKind, ResourceState, ScanStatus,
};
pub use checkpoint::Checkpoint;
pub use export_job::{ExportFormat, ExportJob, ExportJobStatus};
pub use feature::{ExportRow, FeatureValue};
pub use scenario::{
    PhaseTimestamps, Scenario, ScenarioConfigSummary, ScenarioCounters, SplitAssignment,
    SplitSubset,
};
