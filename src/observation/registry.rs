//! Observation registry and handler interface.

use std::fmt;
use std::sync::Arc;

use super::context::ObservationContext;
use super::{Observation, PendingObservation};

/// Receives observation lifecycle notifications.
///
/// Handlers are invoked synchronously on the thread that drives the
/// transition, so implementations should not block. They must not call
/// `error` or `stop` on the observation being reported.
pub trait ObservationHandler: Send + Sync {
    fn on_start(&self, _observation: &Observation) {}

    fn on_error(&self, _observation: &Observation) {}

    fn on_stop(&self, _observation: &Observation) {}
}

/// Registry of observation handlers.
///
/// A registry without handlers is a no-op: observations created through it
/// still track their lifecycle, but never build a context.
#[derive(Clone, Default)]
pub struct ObservationRegistry {
    handlers: Arc<Vec<Arc<dyn ObservationHandler>>>,
}

impl ObservationRegistry {
    /// Registry with no handlers.
    pub fn noop() -> Self {
        Self::default()
    }

    /// Add a handler. Intended for construction time.
    pub fn with_handler(self, handler: impl ObservationHandler + 'static) -> Self {
        self.with_shared_handler(Arc::new(handler))
    }

    /// Add a handler that is also referenced elsewhere.
    pub fn with_shared_handler(self, handler: Arc<dyn ObservationHandler>) -> Self {
        let mut handlers: Vec<_> = self.handlers.iter().cloned().collect();
        handlers.push(handler);
        Self {
            handlers: Arc::new(handlers),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Create an observation that has not been started yet.
    ///
    /// `context` is only invoked when the registry has handlers.
    pub fn create_not_started<F>(&self, name: impl Into<String>, context: F) -> PendingObservation
    where
        F: FnOnce() -> ObservationContext,
    {
        let context = if self.is_noop() { None } else { Some(context()) };
        PendingObservation::new(name.into(), context, self.clone())
    }

    pub(crate) fn notify_start(&self, observation: &Observation) {
        for handler in self.handlers.iter() {
            handler.on_start(observation);
        }
    }

    pub(crate) fn notify_error(&self, observation: &Observation) {
        for handler in self.handlers.iter() {
            handler.on_error(observation);
        }
    }

    pub(crate) fn notify_stop(&self, observation: &Observation) {
        for handler in self.handlers.iter() {
            handler.on_stop(observation);
        }
    }
}

impl fmt::Debug for ObservationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
