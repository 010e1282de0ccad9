use crate::state_machine::{ScenarioStatus, TransitionError};
use thiserror::Error;
use uuid::Uuid;

/// Pipeline service refusals
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    #[error("Scenario {0} not found")]
    ScenarioNotFound(Uuid),

    #[error("Build #{build_number} not found in scenario {scenario_id}")]
    BuildNotFound {
        scenario_id: Uuid,
        build_number: u64,
    },

    #[error("Operation '{operation}' is not valid while the scenario is '{status}'")]
    InvalidPhase {
        operation: &'static str,
        status: ScenarioStatus,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
