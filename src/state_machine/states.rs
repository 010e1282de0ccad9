use serde::{Deserialize, Serialize};
use std::fmt;

/// Scenario lifecycle states: a totally ordered progression with a terminal fork
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Initial state when a scenario is created
    Queued,
    /// Candidate builds are being filtered against the scenario config
    Filtering,
    /// Per-build resources are being fetched and stored
    Ingesting,
    /// All builds reached a terminal ingestion state
    Ingested,
    /// Features (and optionally scans) are being extracted
    Processing,
    /// All builds reached a terminal extraction state
    Processed,
    /// Train/val/test split generation is running
    Splitting,
    /// Pipeline finished successfully
    Completed,
    /// Pipeline failed; `failed_in` on the scenario records the phase
    Failed,
}

impl ScenarioStatus {
    /// Check if this is a terminal state (no further transitions except retry)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if this is the failure terminal
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Check if this is an in-progress phase (work actively running)
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Filtering | Self::Ingesting | Self::Processing | Self::Splitting
        )
    }

    /// Position in the forward progression. `Failed` shares the final rank
    /// with `Completed`: both terminate the progression.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Filtering => 1,
            Self::Ingesting => 2,
            Self::Ingested => 3,
            Self::Processing => 4,
            Self::Processed => 5,
            Self::Splitting => 6,
            Self::Completed | Self::Failed => 7,
        }
    }
}

impl Default for ScenarioStatus {
    fn default() -> Self {
        Self::Queued
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Filtering => write!(f, "filtering"),
            Self::Ingesting => write!(f, "ingesting"),
            Self::Ingested => write!(f, "ingested"),
            Self::Processing => write!(f, "processing"),
            Self::Processed => write!(f, "processed"),
            Self::Splitting => write!(f, "splitting"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ScenarioStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "filtering" => Ok(Self::Filtering),
            "ingesting" => Ok(Self::Ingesting),
            "ingested" => Ok(Self::Ingested),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "splitting" => Ok(Self::Splitting),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid scenario status: {s}")),
        }
    }
}
