//! Request tracker that completes observations carried by statements.

use tracing::trace;

use crate::interfaces::{RequestTracker, SessionError};
use crate::observation::Observation;
use crate::statement::Statement;

/// Stops the observation carried by a completed statement.
///
/// Install this on the delegate session so that execute-kind observations,
/// which the interceptor leaves open by default, are closed. Observations
/// whose stop is guarded by the interceptor are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservationRequestTracker;

impl RequestTracker for ObservationRequestTracker {
    fn on_success(&self, statement: &Statement, session_name: &str) {
        if let Some(observation) = tracked(statement) {
            trace!(observation = %observation.id(), session = session_name, "Request succeeded");
            observation.stop();
        }
    }

    fn on_error(&self, statement: &Statement, error: &SessionError, session_name: &str) {
        if let Some(observation) = tracked(statement) {
            trace!(observation = %observation.id(), session = session_name, "Request failed");
            observation.error(error);
            observation.stop();
        }
    }
}

/// The carried observation, unless the interceptor owns its stop.
fn tracked(statement: &Statement) -> Option<&Observation> {
    statement
        .observation()
        .filter(|observation| !observation.is_stop_guarded())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::observation::{
        ObservationContext, ObservationRegistry, OperationKind, RecordingObservationHandler,
    };

    fn observed(recorder: &Arc<RecordingObservationHandler>) -> Observation {
        let registry = ObservationRegistry::noop().with_shared_handler(recorder.clone());
        registry
            .create_not_started("execute", || ObservationContext {
                operation: OperationKind::Execute,
                statement_summary: "SELECT 1".to_string(),
                session_name: "s0".to_string(),
                keyspace: "system".to_string(),
                remote_service_name: "cassandra".to_string(),
            })
            .start()
    }

    #[test]
    fn test_success_stops_carried_observation() {
        let recorder = Arc::new(RecordingObservationHandler::new());
        let observation = observed(&recorder);
        let statement = Statement::new("SELECT 1").observed_by(observation.clone());

        ObservationRequestTracker.on_success(&statement, "s0");

        assert!(observation.is_stopped());
        assert!(observation.failure().is_none());
        assert_eq!(recorder.stopped_count(observation.id()), 1);
    }

    #[test]
    fn test_error_is_recorded_before_stop() {
        let recorder = Arc::new(RecordingObservationHandler::new());
        let observation = observed(&recorder);
        let statement = Statement::new("SELECT 1").observed_by(observation.clone());

        ObservationRequestTracker.on_error(
            &statement,
            &SessionError::Timeout("read".to_string()),
            "s0",
        );

        assert_eq!(observation.failure().as_deref(), Some("Query timed out: read"));
        assert_eq!(recorder.errored_count(observation.id()), 1);
        assert_eq!(recorder.stopped_count(observation.id()), 1);
    }

    #[test]
    fn test_unobserved_statement_is_ignored() {
        let recorder = Arc::new(RecordingObservationHandler::new());
        ObservationRequestTracker.on_success(&Statement::new("SELECT 1"), "s0");
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_guarded_observation_is_left_to_interceptor() {
        let recorder = Arc::new(RecordingObservationHandler::new());
        let observation = observed(&recorder);
        observation.guard_stop();
        let statement = Statement::new("SELECT 1").observed_by(observation.clone());

        ObservationRequestTracker.on_success(&statement, "s0");
        ObservationRequestTracker.on_error(&statement, &SessionError::Closed, "s0");

        assert!(!observation.is_stopped());
        assert!(observation.failure().is_none());
        assert_eq!(recorder.events_for(observation.id()).len(), 1);
    }
}
