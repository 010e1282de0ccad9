use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-repo resumability record for ingestion.
///
/// The cursor (`last_processed_build_number` / `last_processed_ci_run_id`)
/// only ever advances; a resume processes builds strictly after it in
/// ascending build-number order, so resumption is idempotent (no reprocess,
/// no skip).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub has_checkpoint: bool,
    pub last_checkpoint_at: Option<DateTime<Utc>>,
    /// Builds permanently given up on
    pub accepted_failed: u64,
    /// Free-form outcome counters (e.g. "ingested", "missing_resource")
    pub stats: BTreeMap<String, u64>,
    pub last_processed_build_number: Option<u64>,
    pub last_processed_ci_run_id: Option<u64>,
    pub pending_processing_count: u64,
}

impl Checkpoint {
    /// Advance the resume cursor. Out-of-order completions never move the
    /// cursor backwards.
    pub fn advance(&mut self, build_number: u64, ci_run_id: u64) {
        if self.last_processed_build_number.is_none()
            || self.last_processed_build_number < Some(build_number)
        {
            self.last_processed_build_number = Some(build_number);
            self.last_processed_ci_run_id = Some(ci_run_id);
        }
        self.has_checkpoint = true;
        self.last_checkpoint_at = Some(Utc::now());
    }

    /// Bump a named outcome counter
    pub fn record_stat(&mut self, key: &str) {
        *self.stats.entry(key.to_string()).or_insert(0) += 1;
    }

    /// The lower bound a resume must respect (builds strictly after it)
    pub fn resume_floor(&self) -> u64 {
        self.last_processed_build_number.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_never_regresses() {
        let mut checkpoint = Checkpoint::default();
        checkpoint.advance(42, 1042);
        checkpoint.advance(40, 1040); // out-of-order completion
        assert_eq!(checkpoint.last_processed_build_number, Some(42));
        assert_eq!(checkpoint.last_processed_ci_run_id, Some(1042));
        assert!(checkpoint.has_checkpoint);

        checkpoint.advance(45, 1045);
        assert_eq!(checkpoint.last_processed_build_number, Some(45));
    }

    #[test]
    fn test_record_stat_accumulates() {
        let mut checkpoint = Checkpoint::default();
        checkpoint.record_stat("ingested");
        checkpoint.record_stat("ingested");
        checkpoint.record_stat("missing_resource");
        assert_eq!(checkpoint.stats.get("ingested"), Some(&2));
        assert_eq!(checkpoint.stats.get("missing_resource"), Some(&1));
    }
}
