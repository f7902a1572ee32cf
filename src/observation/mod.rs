//! Observations: one started/stopped measurement per session operation.
//!
//! # Lifecycle
//!
//! ```text
//! PendingObservation --start()--> Observation(Started) --stop()--> Observation(Stopped)
//!                                        |
//!                                     error()  (optional, before stop)
//! ```
//!
//! An [`Observation`] is a cheap, clonable handle. Clones are carried by
//! statements and trackers; whichever party owns completion calls
//! [`Observation::stop`]. Only the first stop takes effect.

mod context;
mod convention;
mod handlers;
mod registry;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use tracing::{field, warn, Span};
use uuid::Uuid;

pub(crate) use context::summarize;
pub use context::{ObservationContext, OperationKind};
pub use convention::{keys, DefaultObservationConvention, KeyValue, ObservationConvention};
#[cfg(feature = "otel")]
pub use handlers::MetricsObservationHandler;
pub use handlers::{
    ObservationEvent, ObservationEventKind, RecordingObservationHandler, TracingObservationHandler,
};
pub use registry::{ObservationHandler, ObservationRegistry};

const STARTED: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle state of a started observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationState {
    Started,
    Stopped,
}

/// An observation that has been created but not started.
///
/// Parent and convention can only be set in this state.
pub struct PendingObservation {
    name: String,
    context: Option<ObservationContext>,
    registry: ObservationRegistry,
    convention: Arc<dyn ObservationConvention>,
    parent: Option<Observation>,
}

impl PendingObservation {
    pub(crate) fn new(
        name: String,
        context: Option<ObservationContext>,
        registry: ObservationRegistry,
    ) -> Self {
        Self {
            name,
            context,
            registry,
            convention: Arc::new(DefaultObservationConvention),
            parent: None,
        }
    }

    pub fn convention(mut self, convention: Arc<dyn ObservationConvention>) -> Self {
        self.convention = convention;
        self
    }

    /// Record `parent` as the enclosing observation.
    pub fn parent(mut self, parent: &Observation) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Start the observation and notify handlers.
    pub fn start(self) -> Observation {
        let contextual_name = match &self.context {
            Some(context) => self.convention.contextual_name(context),
            None => self.name.clone(),
        };
        let parent_span = self.parent.as_ref().and_then(Observation::span_id);
        // without a parent observation the span nests under the caller's span
        let span = match parent_span {
            Some(parent) => tracing::info_span!(
                parent: parent,
                "cassandra.observation",
                otel.name = %contextual_name,
                db.operation = field::Empty,
                db.name = field::Empty,
            ),
            None => tracing::info_span!(
                "cassandra.observation",
                otel.name = %contextual_name,
                db.operation = field::Empty,
                db.name = field::Empty,
            ),
        };
        if let Some(context) = &self.context {
            span.record("db.operation", context.operation.name());
            span.record("db.name", context.keyspace.as_str());
        }

        let observation = Observation {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                name: self.name,
                parent: self.parent,
                context: self.context,
                convention: self.convention,
                registry: self.registry,
                state: AtomicU8::new(STARTED),
                stop_guarded: AtomicBool::new(false),
                transition: Mutex::new(()),
                failure: Mutex::new(None),
                started_at: Instant::now(),
                elapsed: OnceLock::new(),
                span: Mutex::new(Some(span)),
            }),
        };
        observation.inner.registry.notify_start(&observation);
        observation
    }
}

struct Inner {
    id: Uuid,
    name: String,
    parent: Option<Observation>,
    context: Option<ObservationContext>,
    convention: Arc<dyn ObservationConvention>,
    registry: ObservationRegistry,
    state: AtomicU8,
    stop_guarded: AtomicBool,
    /// Serializes error and stop so handlers never see an error after stop.
    transition: Mutex<()>,
    failure: Mutex<Option<String>>,
    started_at: Instant,
    elapsed: OnceLock<Duration>,
    span: Mutex<Option<Span>>,
}

/// Handle to a started observation.
#[derive(Clone)]
pub struct Observation {
    inner: Arc<Inner>,
}

impl Observation {
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&Observation> {
        self.inner.parent.as_ref()
    }

    /// The context, present only when the registry has handlers.
    pub fn context(&self) -> Option<&ObservationContext> {
        self.inner.context.as_ref()
    }

    pub fn contextual_name(&self) -> String {
        match &self.inner.context {
            Some(context) => self.inner.convention.contextual_name(context),
            None => self.inner.name.clone(),
        }
    }

    pub fn convention_name(&self) -> &str {
        self.inner.convention.name()
    }

    pub fn low_cardinality_key_values(&self) -> Vec<KeyValue> {
        self.inner
            .context
            .as_ref()
            .map(|context| self.inner.convention.low_cardinality_key_values(context))
            .unwrap_or_default()
    }

    pub fn high_cardinality_key_values(&self) -> Vec<KeyValue> {
        self.inner
            .context
            .as_ref()
            .map(|context| self.inner.convention.high_cardinality_key_values(context))
            .unwrap_or_default()
    }

    pub fn state(&self) -> ObservationState {
        match self.inner.state.load(Ordering::Acquire) {
            STOPPED => ObservationState::Stopped,
            _ => ObservationState::Started,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == ObservationState::Stopped
    }

    /// Description of the recorded failure, if any.
    pub fn failure(&self) -> Option<String> {
        self.inner
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Time from start to stop, or to now while still running.
    pub fn duration(&self) -> Duration {
        self.inner
            .elapsed
            .get()
            .copied()
            .unwrap_or_else(|| self.inner.started_at.elapsed())
    }

    /// Whether the interceptor that started this observation owns its stop.
    ///
    /// Request trackers leave guarded observations alone.
    pub fn is_stop_guarded(&self) -> bool {
        self.inner.stop_guarded.load(Ordering::Acquire)
    }

    pub(crate) fn guard_stop(&self) {
        self.inner.stop_guarded.store(true, Ordering::Release);
    }

    /// Record a failure. Must precede [`Observation::stop`]; ignored afterwards.
    pub fn error(&self, error: &dyn std::error::Error) {
        let _transition = self.lock_transition();
        if self.is_stopped() {
            warn!(
                observation = %self.inner.id,
                name = %self.inner.name,
                error = %error,
                "Ignoring error recorded on stopped observation"
            );
            return;
        }
        *self
            .inner
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(error.to_string());
        self.inner.registry.notify_error(self);
    }

    /// Stop the observation.
    ///
    /// Returns `false` without notifying handlers if it was already stopped.
    pub fn stop(&self) -> bool {
        let transition = self.lock_transition();
        let transitioned = self
            .inner
            .state
            .compare_exchange(STARTED, STOPPED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if !transitioned {
            warn!(
                observation = %self.inner.id,
                name = %self.inner.name,
                "Rejected second stop of observation"
            );
            return false;
        }

        let _ = self.inner.elapsed.set(self.inner.started_at.elapsed());
        self.inner.registry.notify_stop(self);
        drop(transition);
        self.inner
            .span
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        true
    }

    fn lock_transition(&self) -> std::sync::MutexGuard<'_, ()> {
        self.inner
            .transition
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn span_id(&self) -> Option<tracing::Id> {
        self.inner
            .span
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Span::id)
    }
}

impl PartialEq for Observation {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Observation {}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observation")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("parent", &self.inner.parent.as_ref().map(Observation::id))
            .finish()
    }
}
