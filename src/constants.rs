//! # System Constants
//!
//! Event names, resource vocabulary, and operational defaults for the
//! BuildRisk enrichment core. Defaults here seed the layered configuration
//! in [`crate::config`]; call sites read them from the loaded config, never
//! from this module directly.

/// Lifecycle events published on the delta channel and mirrored to clients
pub mod events {
    /// Partial-patch scenario update (the real-time channel payload)
    pub const SCENARIO_UPDATE: &str = "scenario.update";
    /// Scenario created and queued for filtering
    pub const SCENARIO_CREATED: &str = "scenario.created";
    /// Scenario removed
    pub const SCENARIO_DELETED: &str = "scenario.deleted";

    /// Export job registered and pending
    pub const EXPORT_JOB_CREATED: &str = "export.job_created";
    /// Export job reached a terminal state
    pub const EXPORT_JOB_COMPLETED: &str = "export.job_completed";
    pub const EXPORT_JOB_FAILED: &str = "export.job_failed";
}

/// Default row count above which an export is recommended to run as a job
pub const DEFAULT_ASYNC_THRESHOLD_ROWS: u64 = 50_000;

/// Default hard ceiling on a synchronous export payload, in bytes
pub const DEFAULT_SYNC_BYTE_CEILING: u64 = 32 * 1024 * 1024;

/// Default fixed interval between job status polls, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Default capacity of the broadcast delta channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Default page size for list reads when the caller does not specify one
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Upper bound on any requested page size
pub const MAX_PAGE_LIMIT: usize = 500;

/// Default directory for retained export artifacts
pub const DEFAULT_ARTIFACT_DIR: &str = "exports";
