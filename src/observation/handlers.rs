//! Built-in observation handlers.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::context::ObservationContext;
use super::registry::ObservationHandler;
use super::Observation;

/// Logs observation transitions through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservationHandler;

impl ObservationHandler for TracingObservationHandler {
    fn on_start(&self, observation: &Observation) {
        debug!(
            observation = %observation.id(),
            parent = ?observation.parent().map(Observation::id),
            name = %observation.contextual_name(),
            "Observation started"
        );
    }

    fn on_error(&self, observation: &Observation) {
        let failure = observation.failure().unwrap_or_default();
        warn!(
            observation = %observation.id(),
            name = %observation.contextual_name(),
            error = %failure,
            "Observation failed"
        );
    }

    fn on_stop(&self, observation: &Observation) {
        let statement = observation
            .high_cardinality_key_values()
            .into_iter()
            .next()
            .map(|kv| kv.value)
            .unwrap_or_default();
        info!(
            observation = %observation.id(),
            name = %observation.contextual_name(),
            duration_ms = observation.duration().as_secs_f64() * 1000.0,
            failed = observation.failure().is_some(),
            %statement,
            "Observation stopped"
        );
    }
}

/// Kind of a recorded lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationEventKind {
    Started,
    Errored,
    Stopped,
}

/// One recorded lifecycle transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationEvent {
    pub kind: ObservationEventKind,
    pub id: Uuid,
    pub name: String,
    pub parent: Option<Uuid>,
    pub failure: Option<String>,
    pub context: Option<ObservationContext>,
}

/// Keeps every lifecycle transition in memory.
#[derive(Debug, Default)]
pub struct RecordingObservationHandler {
    events: Mutex<Vec<ObservationEvent>>,
}

impl RecordingObservationHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservationEvent> {
        self.lock().clone()
    }

    pub fn events_for(&self, id: Uuid) -> Vec<ObservationEvent> {
        self.lock().iter().filter(|e| e.id == id).cloned().collect()
    }

    /// Events of the given kind, in recording order.
    pub fn events_of(&self, kind: ObservationEventKind) -> Vec<ObservationEvent> {
        self.lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn started_count(&self) -> usize {
        self.count(|e| e.kind == ObservationEventKind::Started)
    }

    pub fn stopped_count(&self, id: Uuid) -> usize {
        self.count(|e| e.id == id && e.kind == ObservationEventKind::Stopped)
    }

    pub fn errored_count(&self, id: Uuid) -> usize {
        self.count(|e| e.id == id && e.kind == ObservationEventKind::Errored)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn count(&self, predicate: impl Fn(&ObservationEvent) -> bool) -> usize {
        self.lock().iter().filter(|e| predicate(e)).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ObservationEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, kind: ObservationEventKind, observation: &Observation) {
        let event = ObservationEvent {
            kind,
            id: observation.id(),
            name: observation.name().to_string(),
            parent: observation.parent().map(Observation::id),
            failure: observation.failure(),
            context: observation.context().cloned(),
        };
        self.lock().push(event);
    }
}

impl ObservationHandler for RecordingObservationHandler {
    fn on_start(&self, observation: &Observation) {
        self.record(ObservationEventKind::Started, observation);
    }

    fn on_error(&self, observation: &Observation) {
        self.record(ObservationEventKind::Errored, observation);
    }

    fn on_stop(&self, observation: &Observation) {
        self.record(ObservationEventKind::Stopped, observation);
    }
}

/// Records observation durations and totals as OpenTelemetry metrics.
#[cfg(feature = "otel")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservationHandler;

#[cfg(feature = "otel")]
impl ObservationHandler for MetricsObservationHandler {
    fn on_stop(&self, observation: &Observation) {
        use crate::utils::metrics::{self, QUERY_DURATION, QUERY_TOTAL};

        let outcome = if observation.failure().is_some() {
            "error"
        } else {
            "success"
        };
        let mut attributes: Vec<_> = observation
            .low_cardinality_key_values()
            .iter()
            .map(metrics::key_value_attr)
            .collect();
        attributes.push(metrics::outcome_attr(outcome));

        QUERY_DURATION.record(observation.duration().as_secs_f64(), &attributes);
        QUERY_TOTAL.add(1, &attributes);
    }
}
