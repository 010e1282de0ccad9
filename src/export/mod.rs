//! # Export Orchestration
//!
//! Size-gated streaming-vs-job dataset export. The orchestrator classifies
//! exports by estimated size, refuses oversized synchronous payloads, and
//! runs large exports as spawned background jobs with monotonic progress;
//! the client flow wraps it all with transparent fallback and cancellable
//! fixed-interval polling.

pub mod client;
pub mod errors;
pub mod orchestrator;
pub mod render;
pub mod source;

pub use client::{ExportClient, ExportOutcome};
pub use errors::{ExportError, ExportResult};
pub use orchestrator::ExportOrchestrator;
pub use render::Renderer;
pub use source::{artifact_filename, ExportPreview, ExportSource, RowStream, SourceEstimate};
