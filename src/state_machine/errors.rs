use super::states::ScenarioStatus;
use thiserror::Error;

/// Errors raised when a scenario transition is refused
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransitionError {
    #[error("Invalid transition from '{from}' on event '{event}'")]
    InvalidTransition { from: ScenarioStatus, event: String },

    #[error("Retry event '{event}' does not match the failed phase (failed in '{failed_in}')")]
    RetryPhaseMismatch {
        event: String,
        failed_in: ScenarioStatus,
    },

    #[error("Retry requested but the scenario never recorded a failed phase")]
    MissingFailedPhase,
}

pub type TransitionResult<T> = Result<T, TransitionError>;
