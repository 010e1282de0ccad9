//! Crate-level error aggregation.
//!
//! Each subsystem keeps its own error enum; this type exists for callers
//! that drive both the pipeline and the export surfaces and want a single
//! `?`-compatible error path.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Transition(#[from] crate::state_machine::TransitionError),

    #[error(transparent)]
    Service(#[from] crate::pipeline::ServiceError),

    #[error(transparent)]
    Export(#[from] crate::export::ExportError),

    #[error(transparent)]
    Directory(#[from] crate::store::DirectoryError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{next_status, ScenarioEvent, ScenarioStatus};

    #[test]
    fn test_subsystem_errors_convert_via_question_mark() {
        fn advance() -> Result<ScenarioStatus> {
            Ok(next_status(
                ScenarioStatus::Completed,
                &ScenarioEvent::StartFiltering,
            )?)
        }
        assert!(matches!(advance(), Err(CoreError::Transition(_))));
    }
}
