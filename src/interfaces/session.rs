//! CQL session interface.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt};
use uuid::Uuid;

use crate::statement::{Argument, Statement, Value};

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that can occur during session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unsupported arguments {arguments:?}")]
    UnsupportedArguments { arguments: Vec<Argument> },

    #[error("Query timed out: {0}")]
    Timeout(String),

    #[error("Not enough replicas available: {0}")]
    Unavailable(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Session closed")]
    Closed,

    #[error("Request cancelled before completion")]
    Cancelled,

    #[error("Driver error: {0}")]
    Driver(String),
}

/// A single result row, keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// Rows returned by an executed statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

/// A statement prepared on the server.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub id: Uuid,
    pub query: String,
    pub keyspace: Option<String>,
}

impl PreparedStatement {
    /// Bind positional values, producing an executable statement.
    pub fn bind(&self, values: Vec<Value>) -> Statement {
        let statement = Statement::bound(self.query.clone(), self.id, values);
        match &self.keyspace {
            Some(keyspace) => statement.set_keyspace(keyspace.clone()),
            None => statement,
        }
    }
}

/// Outcome of a delegated call: completed, or an async handle still in flight.
pub enum Reply<T> {
    Ready(Result<T>),
    Pending(BoxFuture<'static, Result<T>>),
}

impl<T: Send + 'static> Reply<T> {
    /// Resolve the reply on the calling thread.
    ///
    /// Pending replies block until completion.
    pub fn wait(self) -> Result<T> {
        match self {
            Reply::Ready(result) => result,
            Reply::Pending(pending) => futures::executor::block_on(pending),
        }
    }

    /// Turn the reply into an async handle.
    pub fn into_future(self) -> BoxFuture<'static, Result<T>> {
        match self {
            Reply::Ready(result) => future::ready(result).boxed(),
            Reply::Pending(pending) => pending,
        }
    }
}

/// Interface for a stateful CQL session.
///
/// Implementations:
/// - `InMemorySession`: in-process session for tests and demos
/// - `ObservedSession`: decorator adding observations to any session
#[async_trait]
pub trait CqlSession: Send + Sync {
    /// Name identifying this session.
    fn session_name(&self) -> String;

    /// Keyspace the session is currently using, if any.
    fn keyspace(&self) -> Option<String>;

    /// Execute a statement, blocking until completion.
    fn execute(&self, statement: Statement) -> Result<ResultSet>;

    /// Execute a statement, returning a handle immediately.
    fn execute_async(&self, statement: Statement) -> BoxFuture<'static, Result<ResultSet>>;

    /// Prepare a statement, blocking until completion.
    fn prepare(&self, statement: Statement) -> Result<PreparedStatement>;

    /// Prepare a statement, returning a handle immediately.
    fn prepare_async(&self, statement: Statement)
        -> BoxFuture<'static, Result<PreparedStatement>>;

    /// Whether all nodes agree on the current schema version.
    fn check_schema_agreement(&self) -> Result<bool>;

    /// Close the session.
    async fn close(&self) -> Result<()>;
}

/// Completion hook invoked by a session for execute-kind operations.
///
/// Sessions do not invoke the tracker for prepare operations.
pub trait RequestTracker: Send + Sync {
    /// The statement completed successfully.
    fn on_success(&self, statement: &Statement, session_name: &str);

    /// The statement failed.
    fn on_error(&self, statement: &Statement, error: &SessionError, session_name: &str);
}
