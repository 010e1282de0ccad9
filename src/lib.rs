//! # BuildRisk Core
//!
//! Backend core for the build-risk dashboard: scenario lifecycle
//! propagation and dataset export orchestration.
//!
//! ## Subsystems
//!
//! - **state_machine** — the scenario status vocabulary and validated
//!   lifecycle transitions (queued through completed, failure from any
//!   non-terminal phase, phase-targeted retries)
//! - **pipeline** — the service owning scenarios, per-build ingestion and
//!   extraction records, per-repo resumability checkpoints, retry/resume
//!   planning, and the cursor-paginated audit feed
//! - **events** — the broadcast delta channel: partial, idempotent patches
//!   carrying absolute snapshots, applied last-wins per field
//! - **store** — the client-side cached projection and the reconciler that
//!   keeps it consistent through deltas plus authoritative refetches
//! - **export** — size-gated sync-vs-job dataset export with transparent
//!   fallback, monotonic job progress, and cancellable polling
//!
//! ## Consistency model
//!
//! The pipeline service is the single writer. Clients never mutate
//! optimistically: they learn of changes from command responses, published
//! deltas, or full refetches, and a missed delta is always repaired by the
//! reconciler's refetch backstop.

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod export;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod state_machine;
pub mod store;

pub use config::BuildriskConfig;
pub use error::{CoreError, Result};
pub use events::{DeltaPublisher, ScenarioDelta};
pub use export::{ExportClient, ExportOrchestrator};
pub use models::{ExportFormat, Scenario};
pub use pipeline::ScenarioPipelineService;
pub use state_machine::{ScenarioEvent, ScenarioStatus};
pub use store::{Reconciler, ScenarioStore};
