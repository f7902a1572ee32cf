//! Observed session decorator.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tower::Layer;

use crate::config::ObservationConfig;
use crate::interfaces::{CqlSession, PreparedStatement, Reply, Result, ResultSet};
use crate::observation::{Observation, ObservationRegistry, OperationKind};
use crate::statement::{Argument, Statement};

use super::dispatch::Invocation;
use super::interceptor::ObservationInterceptor;

/// Wraps a [`CqlSession`] so that every call goes through an
/// [`ObservationInterceptor`].
///
/// The wrapper exposes the same surface as the delegate. Callers may scope
/// calls under an enclosing observation with [`ObservedSession::with_parent`].
///
/// # Example
///
/// ```ignore
/// let session = InMemorySession::new("s0").with_tracker(Arc::new(ObservationRequestTracker));
/// let session = ObservedSession::new(session, "cassandra", registry);
///
/// // Use as normal - observations are transparent
/// session.execute(Statement::new("SELECT * FROM users"))?;
/// ```
pub struct ObservedSession<S> {
    delegate: Arc<S>,
    interceptor: Arc<ObservationInterceptor>,
    parent: Option<Observation>,
}

impl<S> Clone for ObservedSession<S> {
    fn clone(&self) -> Self {
        Self {
            delegate: Arc::clone(&self.delegate),
            interceptor: Arc::clone(&self.interceptor),
            parent: self.parent.clone(),
        }
    }
}

impl<S: CqlSession + 'static> ObservedSession<S> {
    pub fn new(
        delegate: S,
        remote_service_name: impl Into<String>,
        registry: ObservationRegistry,
    ) -> Self {
        Self::with_interceptor(
            Arc::new(delegate),
            Arc::new(ObservationInterceptor::new(remote_service_name, registry)),
        )
    }

    pub fn with_interceptor(delegate: Arc<S>, interceptor: Arc<ObservationInterceptor>) -> Self {
        Self {
            delegate,
            interceptor,
            parent: None,
        }
    }

    /// A view of this session whose observations are children of `parent`.
    pub fn with_parent(&self, parent: &Observation) -> Self {
        Self {
            parent: Some(parent.clone()),
            ..self.clone()
        }
    }

    /// The wrapped session.
    pub fn delegate(&self) -> &S {
        &self.delegate
    }

    pub fn interceptor(&self) -> &ObservationInterceptor {
        &self.interceptor
    }

    /// Execute a call given in argument form, e.g. query text plus values.
    pub fn execute_with(&self, arguments: Vec<Argument>) -> Result<ResultSet> {
        let delegate = &self.delegate;
        self.intercept(
            Invocation::new(OperationKind::Execute.name(), arguments),
            |invocation| Reply::Ready(invocation.into_statement().and_then(|s| delegate.execute(s))),
        )
        .wait()
    }

    /// Prepare a call given in argument form.
    pub fn prepare_with(&self, arguments: Vec<Argument>) -> Result<PreparedStatement> {
        let delegate = &self.delegate;
        self.intercept(
            Invocation::new(OperationKind::Prepare.name(), arguments),
            |invocation| Reply::Ready(invocation.into_statement().and_then(|s| delegate.prepare(s))),
        )
        .wait()
    }

    fn intercept<T, P>(&self, invocation: Invocation, proceed: P) -> Reply<T>
    where
        T: Send + 'static,
        P: FnOnce(Invocation) -> Reply<T>,
    {
        self.interceptor.intercept(
            self.delegate.as_ref(),
            invocation,
            self.parent.as_ref(),
            proceed,
        )
    }
}

#[async_trait]
impl<S: CqlSession + 'static> CqlSession for ObservedSession<S> {
    fn session_name(&self) -> String {
        let delegate = &self.delegate;
        self.intercept(Invocation::new("session_name", vec![]), |_| {
            Reply::Ready(Ok(delegate.session_name()))
        })
        .wait()
        .unwrap_or_default()
    }

    fn keyspace(&self) -> Option<String> {
        let delegate = &self.delegate;
        self.intercept(Invocation::new("keyspace", vec![]), |_| {
            Reply::Ready(Ok(delegate.keyspace()))
        })
        .wait()
        .unwrap_or_default()
    }

    fn execute(&self, statement: Statement) -> Result<ResultSet> {
        let delegate = &self.delegate;
        self.intercept(
            Invocation::of(OperationKind::Execute, statement),
            |invocation| Reply::Ready(invocation.into_statement().and_then(|s| delegate.execute(s))),
        )
        .wait()
    }

    fn execute_async(&self, statement: Statement) -> BoxFuture<'static, Result<ResultSet>> {
        let delegate = &self.delegate;
        self.intercept(
            Invocation::of(OperationKind::ExecuteAsync, statement),
            |invocation| match invocation.into_statement() {
                Ok(statement) => Reply::Pending(delegate.execute_async(statement)),
                Err(e) => Reply::Ready(Err(e)),
            },
        )
        .into_future()
    }

    fn prepare(&self, statement: Statement) -> Result<PreparedStatement> {
        let delegate = &self.delegate;
        self.intercept(
            Invocation::of(OperationKind::Prepare, statement),
            |invocation| Reply::Ready(invocation.into_statement().and_then(|s| delegate.prepare(s))),
        )
        .wait()
    }

    fn prepare_async(
        &self,
        statement: Statement,
    ) -> BoxFuture<'static, Result<PreparedStatement>> {
        let delegate = &self.delegate;
        self.intercept(
            Invocation::of(OperationKind::PrepareAsync, statement),
            |invocation| match invocation.into_statement() {
                Ok(statement) => Reply::Pending(delegate.prepare_async(statement)),
                Err(e) => Reply::Ready(Err(e)),
            },
        )
        .into_future()
    }

    fn check_schema_agreement(&self) -> Result<bool> {
        let delegate = &self.delegate;
        self.intercept(Invocation::new("check_schema_agreement", vec![]), |_| {
            Reply::Ready(delegate.check_schema_agreement())
        })
        .wait()
    }

    async fn close(&self) -> Result<()> {
        let delegate = Arc::clone(&self.delegate);
        self.intercept(Invocation::new("close", vec![]), move |_| {
            Reply::Pending(async move { delegate.close().await }.boxed())
        })
        .into_future()
        .await
    }
}

/// [`tower::Layer`] that wraps sessions in [`ObservedSession`].
///
/// All sessions produced by one layer share its interceptor.
#[derive(Clone)]
pub struct ObservationLayer {
    interceptor: Arc<ObservationInterceptor>,
}

impl ObservationLayer {
    pub fn new(interceptor: ObservationInterceptor) -> Self {
        Self {
            interceptor: Arc::new(interceptor),
        }
    }

    pub fn from_config(config: &ObservationConfig, registry: ObservationRegistry) -> Self {
        Self::new(ObservationInterceptor::from_config(config, registry))
    }
}

impl<S: CqlSession + 'static> Layer<S> for ObservationLayer {
    type Service = ObservedSession<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ObservedSession::with_interceptor(Arc::new(inner), Arc::clone(&self.interceptor))
    }
}
