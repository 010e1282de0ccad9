use serde::{Deserialize, Serialize};

/// Events that drive scenario state transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ScenarioEvent {
    /// Begin filtering candidate builds
    StartFiltering,
    /// Filtering finished, begin resource ingestion
    StartIngestion,
    /// Every registered build reached a terminal ingestion state
    CompleteIngestion,
    /// Begin feature extraction over the ingested builds
    StartProcessing,
    /// Every enrichment build reached a terminal extraction state
    CompleteProcessing,
    /// Begin split generation
    StartSplitting,
    /// Split generation finished; the scenario is complete
    CompleteSplitting,
    /// Fail the scenario with an error message
    Fail(String),
    /// Re-run ingestion over retryable failed builds
    RetryIngestion,
    /// Re-run extraction over failed enrichment builds
    RetryProcessing,
}

impl ScenarioEvent {
    /// String form of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StartFiltering => "start_filtering",
            Self::StartIngestion => "start_ingestion",
            Self::CompleteIngestion => "complete_ingestion",
            Self::StartProcessing => "start_processing",
            Self::CompleteProcessing => "complete_processing",
            Self::StartSplitting => "start_splitting",
            Self::CompleteSplitting => "complete_splitting",
            Self::Fail(_) => "fail",
            Self::RetryIngestion => "retry_ingestion",
            Self::RetryProcessing => "retry_processing",
        }
    }

    /// Extract the error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Check if this event moves a failed scenario back into an in-progress phase
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::RetryIngestion | Self::RetryProcessing)
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}
