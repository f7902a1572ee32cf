//! Shared utilities for integration tests.
//!
//! Builds an observed in-memory session with a recording handler attached.

use std::sync::Arc;

use tower::Layer;

use cql_observation::advice::{
    ObservationInterceptor, ObservationLayer, ObservationRequestTracker, ObservedSession,
};
use cql_observation::config::ExecuteCompletion;
use cql_observation::observation::{ObservationRegistry, RecordingObservationHandler};
use cql_observation::session::InMemorySession;

/// Remote service name reported by test observations.
pub const REMOTE_SERVICE_NAME: &str = "cassandra-it";

/// An observed session together with its delegate and recorder.
pub struct Harness {
    pub observed: ObservedSession<InMemorySession>,
    pub session: InMemorySession,
    pub recorder: Arc<RecordingObservationHandler>,
}

/// Observed session whose delegate reports execute completions to a tracker.
pub fn tracked() -> Harness {
    tracked_with(ExecuteCompletion::Tracker)
}

/// Tracker-equipped observed session with an explicit execute completion owner.
pub fn tracked_with(execute_completion: ExecuteCompletion) -> Harness {
    build(true, execute_completion)
}

/// Observed session whose delegate has no tracker installed.
pub fn untracked(execute_completion: ExecuteCompletion) -> Harness {
    build(false, execute_completion)
}

fn build(tracker: bool, execute_completion: ExecuteCompletion) -> Harness {
    let recorder = Arc::new(RecordingObservationHandler::new());
    let registry = ObservationRegistry::noop().with_shared_handler(recorder.clone());
    let interceptor = ObservationInterceptor::new(REMOTE_SERVICE_NAME, registry)
        .with_execute_completion(execute_completion);

    let session = InMemorySession::new("it-session");
    let session = if tracker {
        session.with_tracker(Arc::new(ObservationRequestTracker))
    } else {
        session
    };

    Harness {
        observed: ObservationLayer::new(interceptor).layer(session.clone()),
        session,
        recorder,
    }
}
