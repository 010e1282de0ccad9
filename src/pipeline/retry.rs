//! Pure planners for checkpoint-based retry and resumption.
//!
//! Retry and resume answer different questions. A retry re-targets builds
//! that already failed terminally — those typically sit at or below the
//! checkpoint cursor, so retry targeting is independent of cursor position.
//! A resume continues forward work and must only pick up builds strictly
//! after the cursor, in ascending build-number order, so resumption is
//! idempotent: nothing is reprocessed, nothing is skipped.

use crate::models::{Checkpoint, IngestionBuild};

/// Builds to re-ingest on a retry action: terminal-failure builds
/// (`missing_resource`/`failed`) not permanently excluded. Never targets a
/// build already `ingested`. Ascending build-number order.
pub fn plan_retry(builds: &[IngestionBuild]) -> Vec<u64> {
    let mut targets: Vec<u64> = builds
        .iter()
        .filter(|b| b.is_retryable())
        .map(|b| b.build_number)
        .collect();
    targets.sort_unstable();
    targets
}

/// Builds a resume should process: not yet terminal and strictly after the
/// checkpoint cursor, in ascending build-number order.
pub fn plan_resume(checkpoint: &Checkpoint, builds: &[IngestionBuild]) -> Vec<u64> {
    let floor = checkpoint.resume_floor();
    let mut targets: Vec<u64> = builds
        .iter()
        .filter(|b| !b.status().is_terminal() && b.build_number > floor)
        .map(|b| b.build_number)
        .collect();
    targets.sort_unstable();
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResourceKind, ResourceState};
    use std::collections::BTreeSet;

    fn resources() -> BTreeSet<ResourceKind> {
        [ResourceKind::Logs, ResourceKind::Diff].into_iter().collect()
    }

    fn ingested_build(number: u64) -> IngestionBuild {
        let mut build = IngestionBuild::new(1000 + number, number, "sha", "acme/widgets", resources());
        build.set_resource(ResourceKind::Logs, ResourceState::Ingested, None);
        build.set_resource(ResourceKind::Diff, ResourceState::Ingested, None);
        build
    }

    fn missing_build(number: u64) -> IngestionBuild {
        let mut build = IngestionBuild::new(1000 + number, number, "sha", "acme/widgets", resources());
        build.set_resource(ResourceKind::Logs, ResourceState::Ingested, None);
        build.set_resource(ResourceKind::Diff, ResourceState::Missing, Some("gone".into()));
        build
    }

    fn pending_build(number: u64) -> IngestionBuild {
        IngestionBuild::new(1000 + number, number, "sha", "acme/widgets", resources())
    }

    #[test]
    fn test_retry_targets_only_retryable_failures() {
        // The checkpoint scenario from the observable contract: cursor at 42,
        // build #40 already ingested, build #45 missing a resource
        let builds = vec![ingested_build(40), missing_build(45)];
        assert_eq!(plan_retry(&builds), vec![45]);
    }

    #[test]
    fn test_retry_skips_accepted_builds() {
        let mut accepted = missing_build(45);
        accepted.accepted = true;
        let builds = vec![missing_build(44), accepted, pending_build(46)];
        assert_eq!(plan_retry(&builds), vec![44]);
    }

    #[test]
    fn test_resume_is_strictly_after_cursor_ascending() {
        let mut checkpoint = Checkpoint::default();
        checkpoint.advance(42, 1042);

        let builds = vec![
            pending_build(50),
            pending_build(43),
            pending_build(42), // at the cursor: already processed
            ingested_build(44), // terminal: never reprocessed
            pending_build(41),
        ];
        assert_eq!(plan_resume(&checkpoint, &builds), vec![43, 50]);
    }

    #[test]
    fn test_resume_with_no_checkpoint_processes_everything_pending() {
        let checkpoint = Checkpoint::default();
        let builds = vec![pending_build(2), pending_build(1), ingested_build(3)];
        assert_eq!(plan_resume(&checkpoint, &builds), vec![1, 2]);
    }
}
