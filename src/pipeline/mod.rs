//! # Scenario Pipeline
//!
//! The command/response side of scenario propagation: the service owning
//! scenario state, the pure retry/resume planners, and the cursor-paginated
//! audit log feed.

pub mod errors;
pub mod log_feed;
pub mod retry;
pub mod service;

pub use errors::{ServiceError, ServiceResult};
pub use log_feed::{AuditLogEntry, CursorLogFeed, LogPage};
pub use retry::{plan_resume, plan_retry};
pub use service::{
    BuildFilter, BuildPreview, CandidateBuild, CreateScenarioRequest, ListQuery, Page, PageRequest,
    PreviewStats, RetryResponse, ScanStatusEntry, ScenarioPipelineService,
};
