use crate::models::Scenario;
use crate::state_machine::ScenarioStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `scenario.update` payload: a partial patch for one scenario.
///
/// Every present field is an absolute snapshot that overwrites the cached
/// value; absent fields leave the cached value untouched. A delta is never a
/// full replace and never an increment, which makes application idempotent
/// and safe under transport reordering (last-applied-wins per field).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDelta {
    pub scenario_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ScenarioStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builds_ingested: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builds_total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builds_features_extracted: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ScenarioDelta {
    /// A status-only patch
    pub fn status(scenario_id: Uuid, status: ScenarioStatus) -> Self {
        Self {
            scenario_id,
            status: Some(status),
            ..Self::default()
        }
    }

    /// A counters-only patch carrying the current absolute counts
    pub fn counters(
        scenario_id: Uuid,
        builds_total: u64,
        builds_ingested: u64,
        builds_features_extracted: u64,
    ) -> Self {
        Self {
            scenario_id,
            builds_total: Some(builds_total),
            builds_ingested: Some(builds_ingested),
            builds_features_extracted: Some(builds_features_extracted),
            ..Self::default()
        }
    }

    /// Whether this delta announces a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|s| s.is_terminal())
    }

    /// Overwrite the named fields of a cached scenario with this patch
    pub fn apply_to(&self, scenario: &mut Scenario) {
        if let Some(status) = self.status {
            scenario.status = status;
        }
        if let Some(ingested) = self.builds_ingested {
            scenario.counters.builds_ingested = ingested;
        }
        if let Some(total) = self.builds_total {
            scenario.counters.builds_total = total;
        }
        if let Some(extracted) = self.builds_features_extracted {
            scenario.counters.builds_features_extracted = extracted;
        }
        if let Some(message) = &self.error_message {
            scenario.error_message = Some(message.clone());
        }
    }
}
