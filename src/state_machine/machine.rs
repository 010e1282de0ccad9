use super::{
    errors::{TransitionError, TransitionResult},
    events::ScenarioEvent,
    states::ScenarioStatus,
};
use crate::events::{DeltaPublisher, ScenarioDelta};
use crate::logging::log_scenario_transition;
use crate::models::Scenario;
use chrono::Utc;

/// Determine the target state for an event, or refuse the transition.
///
/// Pure transition table: phase events advance exactly one phase in the
/// progression, `Fail` is accepted from every non-terminal state, and retry
/// events move `Failed` back to the corresponding in-progress phase. The
/// retry/failed-phase match is a separate guard checked by
/// [`ScenarioStateMachine::transition`], since it depends on the scenario,
/// not the status alone.
pub fn next_status(current: ScenarioStatus, event: &ScenarioEvent) -> TransitionResult<ScenarioStatus> {
    use ScenarioEvent as E;
    use ScenarioStatus as S;

    let target = match (current, event) {
        (S::Queued, E::StartFiltering) => S::Filtering,
        (S::Filtering, E::StartIngestion) => S::Ingesting,
        (S::Ingesting, E::CompleteIngestion) => S::Ingested,
        (S::Ingested, E::StartProcessing) => S::Processing,
        (S::Processing, E::CompleteProcessing) => S::Processed,
        (S::Processed, E::StartSplitting) => S::Splitting,
        (S::Splitting, E::CompleteSplitting) => S::Completed,

        // Failure is reachable from every non-terminal state
        (from, E::Fail(_)) if !from.is_terminal() => S::Failed,

        // Retry resets a failed sub-phase to its in-progress state, never to queued
        (S::Failed, E::RetryIngestion) => S::Ingesting,
        (S::Failed, E::RetryProcessing) => S::Processing,

        (from, event) => {
            return Err(TransitionError::InvalidTransition {
                from,
                event: event.event_type().to_string(),
            })
        }
    };

    Ok(target)
}

/// Applies validated transitions to an owned scenario: checks the retry
/// guard, stamps phase-completion timestamps, records failure context, and
/// publishes the corresponding status delta.
pub struct ScenarioStateMachine<'a> {
    scenario: &'a mut Scenario,
    publisher: &'a DeltaPublisher,
}

impl<'a> ScenarioStateMachine<'a> {
    pub fn new(scenario: &'a mut Scenario, publisher: &'a DeltaPublisher) -> Self {
        Self {
            scenario,
            publisher,
        }
    }

    /// Attempt to transition the scenario, publishing a delta on success
    pub fn transition(&mut self, event: ScenarioEvent) -> TransitionResult<ScenarioStatus> {
        let current = self.scenario.status;
        let target = next_status(current, &event)?;

        if event.is_retry() {
            self.check_retry_guard(&event, target)?;
        }

        self.apply(current, &event, target);

        log_scenario_transition(
            self.scenario.id,
            &current.to_string(),
            &target.to_string(),
            event.event_type(),
        );

        self.publisher.publish(self.delta_for(&event, target));

        Ok(target)
    }

    /// Retry events must match the phase the scenario failed in
    fn check_retry_guard(
        &self,
        event: &ScenarioEvent,
        target: ScenarioStatus,
    ) -> TransitionResult<()> {
        let failed_in = self
            .scenario
            .failed_in
            .ok_or(TransitionError::MissingFailedPhase)?;

        if failed_in != target {
            return Err(TransitionError::RetryPhaseMismatch {
                event: event.event_type().to_string(),
                failed_in,
            });
        }

        Ok(())
    }

    fn apply(&mut self, current: ScenarioStatus, event: &ScenarioEvent, target: ScenarioStatus) {
        let now = Utc::now();
        let scenario = &mut *self.scenario;

        match event {
            ScenarioEvent::StartIngestion => {
                scenario.timestamps.filtering_completed_at = Some(now);
            }
            ScenarioEvent::CompleteIngestion => {
                scenario.timestamps.ingestion_completed_at = Some(now);
            }
            ScenarioEvent::CompleteProcessing => {
                scenario.timestamps.processing_completed_at = Some(now);
            }
            ScenarioEvent::CompleteSplitting => {
                scenario.timestamps.splitting_completed_at = Some(now);
            }
            ScenarioEvent::Fail(message) => {
                scenario.error_message = Some(message.clone());
                scenario.failed_in = Some(current);
            }
            ScenarioEvent::RetryIngestion | ScenarioEvent::RetryProcessing => {
                scenario.error_message = None;
                scenario.failed_in = None;
                scenario.retry_count += 1;
            }
            _ => {}
        }

        scenario.status = target;
        scenario.updated_at = now;
    }

    fn delta_for(&self, event: &ScenarioEvent, target: ScenarioStatus) -> ScenarioDelta {
        let mut delta = ScenarioDelta::status(self.scenario.id, target);
        if let Some(message) = event.error_message() {
            delta.error_message = Some(message.to_string());
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DeltaPublisher;
    use crate::models::Scenario;

    fn scenario_at(status: ScenarioStatus) -> Scenario {
        let mut scenario = Scenario::new("unit", "");
        scenario.status = status;
        scenario
    }

    #[test]
    fn test_happy_path_advances_one_phase_at_a_time() {
        let steps = [
            (ScenarioStatus::Queued, ScenarioEvent::StartFiltering, ScenarioStatus::Filtering),
            (ScenarioStatus::Filtering, ScenarioEvent::StartIngestion, ScenarioStatus::Ingesting),
            (ScenarioStatus::Ingesting, ScenarioEvent::CompleteIngestion, ScenarioStatus::Ingested),
            (ScenarioStatus::Ingested, ScenarioEvent::StartProcessing, ScenarioStatus::Processing),
            (ScenarioStatus::Processing, ScenarioEvent::CompleteProcessing, ScenarioStatus::Processed),
            (ScenarioStatus::Processed, ScenarioEvent::StartSplitting, ScenarioStatus::Splitting),
            (ScenarioStatus::Splitting, ScenarioEvent::CompleteSplitting, ScenarioStatus::Completed),
        ];
        for (from, event, to) in steps {
            assert_eq!(next_status(from, &event).unwrap(), to);
        }
    }

    #[test]
    fn test_fail_reachable_from_every_non_terminal_state() {
        let non_terminal = [
            ScenarioStatus::Queued,
            ScenarioStatus::Filtering,
            ScenarioStatus::Ingesting,
            ScenarioStatus::Ingested,
            ScenarioStatus::Processing,
            ScenarioStatus::Processed,
            ScenarioStatus::Splitting,
        ];
        for from in non_terminal {
            let target = next_status(from, &ScenarioEvent::fail_with_error("boom")).unwrap();
            assert_eq!(target, ScenarioStatus::Failed);
        }
        assert!(next_status(
            ScenarioStatus::Completed,
            &ScenarioEvent::fail_with_error("boom")
        )
        .is_err());
    }

    #[test]
    fn test_no_regression_without_retry() {
        // Completing ingestion from a later phase is refused
        assert!(next_status(ScenarioStatus::Processed, &ScenarioEvent::CompleteIngestion).is_err());
        // Skipping ahead is refused
        assert!(next_status(ScenarioStatus::Queued, &ScenarioEvent::StartProcessing).is_err());
    }

    #[test]
    fn test_retry_targets_the_failed_phase() {
        let publisher = DeltaPublisher::default();

        let mut scenario = scenario_at(ScenarioStatus::Ingesting);
        ScenarioStateMachine::new(&mut scenario, &publisher)
            .transition(ScenarioEvent::fail_with_error("rate limited"))
            .unwrap();
        assert_eq!(scenario.status, ScenarioStatus::Failed);
        assert_eq!(scenario.failed_in, Some(ScenarioStatus::Ingesting));
        assert_eq!(scenario.error_message.as_deref(), Some("rate limited"));

        // Wrong retry kind is refused
        let err = ScenarioStateMachine::new(&mut scenario, &publisher)
            .transition(ScenarioEvent::RetryProcessing)
            .unwrap_err();
        assert!(matches!(err, TransitionError::RetryPhaseMismatch { .. }));

        // Matching retry resets to ingesting, not queued
        ScenarioStateMachine::new(&mut scenario, &publisher)
            .transition(ScenarioEvent::RetryIngestion)
            .unwrap();
        assert_eq!(scenario.status, ScenarioStatus::Ingesting);
        assert_eq!(scenario.error_message, None);
        assert_eq!(scenario.failed_in, None);
        assert_eq!(scenario.retry_count, 1);
    }

    #[test]
    fn test_transition_publishes_status_delta() {
        let publisher = DeltaPublisher::default();
        let mut receiver = publisher.subscribe();

        let mut scenario = scenario_at(ScenarioStatus::Queued);
        ScenarioStateMachine::new(&mut scenario, &publisher)
            .transition(ScenarioEvent::StartFiltering)
            .unwrap();

        let delta = receiver.try_recv().unwrap();
        assert_eq!(delta.scenario_id, scenario.id);
        assert_eq!(delta.status, Some(ScenarioStatus::Filtering));
        assert_eq!(delta.error_message, None);
    }
}
