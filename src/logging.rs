//! # Structured Logging
//!
//! Console tracing initialization plus structured helpers for the lifecycle
//! events worth correlating across the pipeline and export subsystems.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console logging once. Honors `RUST_LOG`; defaults to `info`.
/// Safe to call repeatedly and from tests — later calls are no-ops.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .finish();

        // A test harness may have installed a subscriber already
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::debug!("global tracing subscriber already set, continuing");
        }
    });
}

/// Log a validated scenario state transition
pub fn log_scenario_transition(scenario_id: Uuid, from: &str, to: &str, event: &str) {
    tracing::info!(
        scenario_id = %scenario_id,
        from = %from,
        to = %to,
        event = %event,
        "SCENARIO_TRANSITION"
    );
}

/// Log an export job lifecycle event; `event` is one of the shared names
/// in [`crate::constants::events`]
pub fn log_export_job(
    job_id: Uuid,
    event: &'static str,
    processed_rows: u64,
    total_rows: u64,
    details: Option<&str>,
) {
    tracing::info!(
        job_id = %job_id,
        event,
        processed_rows,
        total_rows,
        details,
        "EXPORT_JOB"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_reentrant() {
        init_logging();
        init_logging();
        log_scenario_transition(Uuid::new_v4(), "queued", "filtering", "start_filtering");
    }

    #[test]
    fn test_export_job_logs_use_shared_event_names() {
        init_logging();
        log_export_job(
            Uuid::new_v4(),
            crate::constants::events::EXPORT_JOB_COMPLETED,
            10,
            10,
            None,
        );
    }
}
