//! Observation interceptor.
//!
//! Wraps a delegated session call in an observation lifecycle:
//!
//! | Operation       | Stopped by                                   |
//! |-----------------|----------------------------------------------|
//! | `execute`       | request tracker (or interceptor, see config) |
//! | `execute_async` | request tracker (or interceptor, see config) |
//! | `prepare`       | interceptor, when the call returns           |
//! | `prepare_async` | interceptor, when the future completes       |
//!
//! Statements that already carry an observation are forwarded unchanged.

use std::sync::Arc;

use futures::future::FutureExt;
use tracing::debug;

use crate::config::{ExecuteCompletion, ObservationConfig, DEFAULT_KEYSPACE};
use crate::interfaces::{CqlSession, Reply, Result, SessionError};
use crate::observation::{
    summarize, DefaultObservationConvention, Observation, ObservationContext,
    ObservationConvention, ObservationRegistry, OperationKind,
};
use crate::statement::Statement;

use super::dispatch::{classify, Dispatch, Invocation};

/// Intercepts session calls and manages their observations.
///
/// Holds read-only configuration only; safe to share across threads.
pub struct ObservationInterceptor {
    remote_service_name: String,
    registry: ObservationRegistry,
    convention: Arc<dyn ObservationConvention>,
    default_keyspace: String,
    execute_completion: ExecuteCompletion,
    record_statement: bool,
    statement_max_length: usize,
}

impl ObservationInterceptor {
    pub fn new(remote_service_name: impl Into<String>, registry: ObservationRegistry) -> Self {
        let defaults = ObservationConfig::default();
        Self {
            remote_service_name: remote_service_name.into(),
            registry,
            convention: Arc::new(DefaultObservationConvention),
            default_keyspace: DEFAULT_KEYSPACE.to_string(),
            execute_completion: defaults.execute_completion,
            record_statement: defaults.statement.record,
            statement_max_length: defaults.statement.max_length,
        }
    }

    /// Build from configuration. A disabled config yields a no-op registry.
    pub fn from_config(config: &ObservationConfig, registry: ObservationRegistry) -> Self {
        let registry = if config.enabled {
            registry
        } else {
            ObservationRegistry::noop()
        };
        Self {
            remote_service_name: config.remote_service_name.clone(),
            registry,
            convention: Arc::new(DefaultObservationConvention),
            default_keyspace: config.default_keyspace.clone(),
            execute_completion: config.execute_completion,
            record_statement: config.statement.record,
            statement_max_length: config.statement.max_length,
        }
    }

    pub fn with_convention(mut self, convention: Arc<dyn ObservationConvention>) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_execute_completion(mut self, execute_completion: ExecuteCompletion) -> Self {
        self.execute_completion = execute_completion;
        self
    }

    pub fn remote_service_name(&self) -> &str {
        &self.remote_service_name
    }

    pub fn registry(&self) -> &ObservationRegistry {
        &self.registry
    }

    /// Intercept one call on `session`.
    ///
    /// `proceed` performs the real call. It receives the original invocation
    /// for passthrough calls, and an invocation whose single argument is the
    /// observed statement otherwise. `ambient` becomes the parent of any
    /// observation started here.
    pub fn intercept<S, T, P>(
        &self,
        session: &S,
        invocation: Invocation,
        ambient: Option<&Observation>,
        proceed: P,
    ) -> Reply<T>
    where
        S: CqlSession + ?Sized,
        T: Send + 'static,
        P: FnOnce(Invocation) -> Reply<T>,
    {
        let (kind, statement) = match classify(invocation) {
            Ok(Dispatch::Passthrough(invocation)) => {
                debug!(operation = invocation.operation(), "Passing through");
                return proceed(invocation);
            }
            Ok(Dispatch::Observe { kind, statement }) => (kind, statement),
            Err(e) => return Reply::Ready(Err(e)),
        };

        if statement.is_observed() {
            debug!(
                operation = %kind,
                observation = ?statement.observation().map(Observation::id),
                "Statement already observed, forwarding"
            );
            return proceed(Invocation::of(kind, statement));
        }

        let observation = self.start_observation(session, &statement, kind, ambient);
        let carrier = statement.observed_by(observation.clone());

        if !kind.is_prepare() && self.execute_completion == ExecuteCompletion::Tracker {
            return proceed(Invocation::of(kind, carrier));
        }

        let guard = StopGuard::new(observation);
        match proceed(Invocation::of(kind, carrier)) {
            Reply::Ready(result) => {
                guard.finish(&result);
                Reply::Ready(result)
            }
            Reply::Pending(pending) => Reply::Pending(
                async move {
                    let result = pending.await;
                    guard.finish(&result);
                    result
                }
                .boxed(),
            ),
        }
    }

    /// Create, parent and start the observation for one call.
    pub fn start_observation<S>(
        &self,
        session: &S,
        statement: &Statement,
        kind: OperationKind,
        ambient: Option<&Observation>,
    ) -> Observation
    where
        S: CqlSession + ?Sized,
    {
        let pending = self
            .registry
            .create_not_started(kind.name(), || self.context(session, statement, kind))
            .convention(Arc::clone(&self.convention));

        match ambient {
            Some(parent) => pending.parent(parent).start(),
            None => pending.start(),
        }
    }

    fn context<S>(&self, session: &S, statement: &Statement, kind: OperationKind) -> ObservationContext
    where
        S: CqlSession + ?Sized,
    {
        let statement_summary = if self.record_statement {
            summarize(statement.query(), self.statement_max_length)
        } else {
            String::new()
        };
        let keyspace = statement
            .options()
            .keyspace
            .clone()
            .or_else(|| session.keyspace())
            .unwrap_or_else(|| self.default_keyspace.clone());

        ObservationContext {
            operation: kind,
            statement_summary,
            session_name: session.session_name(),
            keyspace,
            remote_service_name: self.remote_service_name.clone(),
        }
    }
}

/// Sole owner of stopping an observation the interceptor started.
///
/// The observation is marked as guarded so request trackers skip it.
/// `finish` consumes the guard, so a guarded observation is stopped at most
/// once by the interceptor. Dropping an unfinished guard (panic in the
/// delegate, or the pending future dropped) records a failure and stops.
struct StopGuard {
    observation: Option<Observation>,
}

impl StopGuard {
    fn new(observation: Observation) -> Self {
        observation.guard_stop();
        Self {
            observation: Some(observation),
        }
    }

    fn finish<T>(mut self, result: &Result<T>) {
        if let Some(observation) = self.observation.take() {
            if let Err(e) = result {
                observation.error(e);
            }
            observation.stop();
        }
    }
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        if let Some(observation) = self.observation.take() {
            if std::thread::panicking() {
                observation.error(&SessionError::Driver(
                    "delegate panicked".to_string(),
                ));
            } else {
                observation.error(&SessionError::Cancelled);
            }
            observation.stop();
        }
    }
}
