//! In-memory CQL session.
//!
//! Executes nothing remotely. Every received statement is recorded together
//! with the state of its observation at the moment the session saw it, which
//! makes the session useful for tests and demos of the observation layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tracing::debug;
use uuid::Uuid;

use crate::interfaces::{
    CqlSession, PreparedStatement, RequestTracker, Result, ResultSet, Row, SessionError,
};
use crate::observation::{Observation, ObservationState, OperationKind};
use crate::statement::Statement;

/// A statement as seen by the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedStatement {
    pub operation: OperationKind,
    pub query: String,
    pub prepared_id: Option<Uuid>,
    pub observation_id: Option<Uuid>,
    pub observation_state: Option<ObservationState>,
}

#[derive(Default)]
struct Inner {
    name: String,
    keyspace: Mutex<Option<String>>,
    received: Mutex<Vec<ReceivedStatement>>,
    next_failure: Mutex<Option<SessionError>>,
    next_rows: Mutex<Vec<Row>>,
    async_delay: Mutex<Option<Duration>>,
    tracker: Mutex<Option<Arc<dyn RequestTracker>>>,
    closed: AtomicBool,
}

/// In-memory session. Clones share state.
#[derive(Clone, Default)]
pub struct InMemorySession {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemorySession {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                ..Inner::default()
            }),
        }
    }

    /// Install the tracker notified on completion of execute operations.
    pub fn with_tracker(self, tracker: Arc<dyn RequestTracker>) -> Self {
        *lock(&self.inner.tracker) = Some(tracker);
        self
    }

    /// Fail the next operation with `error`.
    pub fn fail_next(&self, error: SessionError) {
        *lock(&self.inner.next_failure) = Some(error);
    }

    /// Rows returned by the next execute operation.
    pub fn set_next_rows(&self, rows: Vec<Row>) {
        *lock(&self.inner.next_rows) = rows;
    }

    /// Delay completion of async operations. Requires a Tokio runtime.
    pub fn set_async_delay(&self, delay: Duration) {
        *lock(&self.inner.async_delay) = Some(delay);
    }

    /// Statements received so far, in arrival order.
    pub fn received(&self) -> Vec<ReceivedStatement> {
        lock(&self.inner.received).clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn delayed<T, F>(&self, run: F) -> BoxFuture<'static, Result<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let delay = *lock(&self.inner.async_delay);
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            run(&inner)
        }
        .boxed()
    }
}

impl Inner {
    fn receive(&self, operation: OperationKind, statement: &Statement) {
        let observation = statement.observation();
        debug!(
            session = %self.name,
            %operation,
            query = statement.query(),
            observed = observation.is_some(),
            "Statement received"
        );
        lock(&self.received).push(ReceivedStatement {
            operation,
            query: statement.query().to_string(),
            prepared_id: statement.prepared_id(),
            observation_id: observation.map(Observation::id),
            observation_state: observation.map(Observation::state),
        });
    }

    fn check(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Closed);
        }
        match lock(&self.next_failure).take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn execute(&self, operation: OperationKind, statement: Statement) -> Result<ResultSet> {
        self.receive(operation, &statement);

        let result = self.check().map(|()| {
            if let Some(keyspace) = use_keyspace(statement.query()) {
                *lock(&self.keyspace) = Some(keyspace);
            }
            ResultSet::new(std::mem::take(&mut *lock(&self.next_rows)))
        });

        let tracker = lock(&self.tracker).clone();
        if let Some(tracker) = tracker {
            match &result {
                Ok(_) => tracker.on_success(&statement, &self.name),
                Err(e) => tracker.on_error(&statement, e, &self.name),
            }
        }
        result
    }

    fn prepare(&self, operation: OperationKind, statement: Statement) -> Result<PreparedStatement> {
        self.receive(operation, &statement);
        self.check()?;

        let keyspace = statement
            .options()
            .keyspace
            .clone()
            .or_else(|| lock(&self.keyspace).clone());
        Ok(PreparedStatement {
            id: Uuid::new_v4(),
            query: statement.query().to_string(),
            keyspace,
        })
    }
}

/// Keyspace named by a `USE <keyspace>` statement.
fn use_keyspace(query: &str) -> Option<String> {
    let mut words = query.trim().trim_end_matches(';').split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(verb), Some(keyspace), None) if verb.eq_ignore_ascii_case("use") => {
            Some(keyspace.trim_matches('"').to_string())
        }
        _ => None,
    }
}

#[async_trait]
impl CqlSession for InMemorySession {
    fn session_name(&self) -> String {
        self.inner.name.clone()
    }

    fn keyspace(&self) -> Option<String> {
        lock(&self.inner.keyspace).clone()
    }

    fn execute(&self, statement: Statement) -> Result<ResultSet> {
        self.inner.execute(OperationKind::Execute, statement)
    }

    fn execute_async(&self, statement: Statement) -> BoxFuture<'static, Result<ResultSet>> {
        self.delayed(move |inner| inner.execute(OperationKind::ExecuteAsync, statement))
    }

    fn prepare(&self, statement: Statement) -> Result<PreparedStatement> {
        self.inner.prepare(OperationKind::Prepare, statement)
    }

    fn prepare_async(
        &self,
        statement: Statement,
    ) -> BoxFuture<'static, Result<PreparedStatement>> {
        self.delayed(move |inner| inner.prepare(OperationKind::PrepareAsync, statement))
    }

    fn check_schema_agreement(&self) -> Result<bool> {
        self.inner.check().map(|()| true)
    }

    async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }
}
