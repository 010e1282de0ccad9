use crate::state_machine::ScenarioStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Absolute counter snapshot carried on a scenario.
///
/// Counters are recomputed from the build sets on every mutation and are
/// never incremented in place, so a published delta always carries an
/// absolute value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioCounters {
    pub builds_total: u64,
    pub builds_ingested: u64,
    pub builds_features_extracted: u64,
    pub builds_missing_resource: u64,
    pub builds_failed: u64,
    pub scans_total: u64,
    pub scans_completed: u64,
    pub scans_failed: u64,
    pub train_count: u64,
    pub val_count: u64,
    pub test_count: u64,
}

/// Summary of the scenario configuration relevant to clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfigSummary {
    pub splitting_strategy: String,
    pub group_by: Option<String>,
}

/// Per-phase completion timestamps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimestamps {
    pub filtering_completed_at: Option<DateTime<Utc>>,
    pub ingestion_completed_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
    pub splitting_completed_at: Option<DateTime<Utc>>,
}

/// One end-to-end run of the enrichment pipeline over a filtered build set.
///
/// Owned by the pipeline service; clients hold a read-mostly cached
/// projection mutated only by full reloads and applied deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ScenarioStatus,
    pub counters: ScenarioCounters,
    pub config: ScenarioConfigSummary,
    pub timestamps: PhaseTimestamps,
    /// Set iff the scenario is failed
    pub error_message: Option<String>,
    /// The phase active at failure time; drives retry targeting
    pub failed_in: Option<ScenarioStatus>,
    /// Number of retry actions applied over the scenario's lifetime
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            status: ScenarioStatus::default(),
            counters: ScenarioCounters::default(),
            config: ScenarioConfigSummary::default(),
            timestamps: PhaseTimestamps::default(),
            error_message: None,
            failed_in: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_config(mut self, config: ScenarioConfigSummary) -> Self {
        self.config = config;
        self
    }

    /// Case-insensitive match against name and description, used by list search
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Subset assignment produced by split generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitSubset {
    Train,
    Val,
    Test,
}

/// One build's placement in the generated dataset split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitAssignment {
    pub build_number: u64,
    pub commit_sha: String,
    pub subset: SplitSubset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_scenario_starts_queued_with_zero_counters() {
        let scenario = Scenario::new("risk-v1", "first run");
        assert_eq!(scenario.status, ScenarioStatus::Queued);
        assert_eq!(scenario.counters, ScenarioCounters::default());
        assert_eq!(scenario.retry_count, 0);
        assert!(scenario.error_message.is_none());
    }

    #[test]
    fn test_matches_query_is_case_insensitive() {
        let scenario = Scenario::new("Risk-V1", "Nightly enrichment");
        assert!(scenario.matches_query("risk"));
        assert!(scenario.matches_query("NIGHTLY"));
        assert!(!scenario.matches_query("weekly"));
    }
}
