//! CQL statement model.
//!
//! A [`Statement`] is the canonical form of every request sent through a
//! [`CqlSession`](crate::interfaces::CqlSession). Call shapes such as
//! `execute("SELECT ...")` or `execute("INSERT ...", values)` are normalized
//! into a statement via [`Statement::from_arguments`].
//!
//! A statement may carry an attached [`Observation`]. Such a statement is a
//! *carrier*: it flows through the delegate session unchanged in every other
//! respect, and the observation layer uses it to avoid instrumenting the same
//! request twice.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::interfaces::{Result, SessionError};
use crate::observation::Observation;

/// A bindable CQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    BigInt(i64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::BigInt(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

/// One argument of an intercepted session call.
#[derive(Debug, Clone)]
pub enum Argument {
    /// Query text.
    Text(String),
    /// Positional bind values.
    Values(Vec<Value>),
    /// Named bind values.
    Named(BTreeMap<String, Value>),
    /// A single scalar value.
    Value(Value),
    /// An already built statement.
    Statement(Statement),
}

impl From<&str> for Argument {
    fn from(query: &str) -> Self {
        Argument::Text(query.to_string())
    }
}

impl From<String> for Argument {
    fn from(query: String) -> Self {
        Argument::Text(query)
    }
}

impl From<Vec<Value>> for Argument {
    fn from(values: Vec<Value>) -> Self {
        Argument::Values(values)
    }
}

impl From<BTreeMap<String, Value>> for Argument {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Argument::Named(values)
    }
}

impl From<Statement> for Argument {
    fn from(statement: Statement) -> Self {
        Argument::Statement(statement)
    }
}

/// Bind values of a statement. The variant selects the statement shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BindValues {
    /// Raw query text, nothing to bind.
    #[default]
    None,
    Positional(Vec<Value>),
    Named(BTreeMap<String, Value>),
}

/// Consistency level requested for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consistency {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    LocalOne,
}

/// Per-statement execution options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOptions {
    pub keyspace: Option<String>,
    pub consistency: Option<Consistency>,
    pub page_size: Option<u32>,
    pub idempotent: Option<bool>,
    pub timeout: Option<Duration>,
    pub tracing: bool,
}

/// A CQL request.
#[derive(Debug, Clone)]
pub struct Statement {
    query: String,
    values: BindValues,
    prepared_id: Option<Uuid>,
    options: StatementOptions,
    observation: Option<Observation>,
}

impl Statement {
    /// Create a raw-text statement.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            values: BindValues::None,
            prepared_id: None,
            options: StatementOptions::default(),
            observation: None,
        }
    }

    /// Create a statement with positional bind values.
    pub fn with_values(query: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            values: BindValues::Positional(values),
            ..Self::new(query)
        }
    }

    /// Create a statement with named bind values.
    pub fn with_named_values(query: impl Into<String>, values: BTreeMap<String, Value>) -> Self {
        Self {
            values: BindValues::Named(values),
            ..Self::new(query)
        }
    }

    pub(crate) fn bound(query: String, prepared_id: Uuid, values: Vec<Value>) -> Self {
        Self {
            values: BindValues::Positional(values),
            prepared_id: Some(prepared_id),
            ..Self::new(query)
        }
    }

    /// Build a statement from the arguments of an intercepted call.
    ///
    /// Rules, in order:
    /// 1. A leading [`Argument::Statement`] is returned as is.
    /// 2. A single [`Argument::Text`] yields a raw-text statement.
    /// 3. Text followed by [`Argument::Named`] yields a named-values statement;
    ///    text followed by [`Argument::Values`] yields a positional one.
    ///
    /// Anything else fails with [`SessionError::UnsupportedArguments`].
    pub fn from_arguments(arguments: Vec<Argument>) -> Result<Statement> {
        let mut iter = arguments.into_iter();
        match (iter.next(), iter.next(), iter.next()) {
            (Some(Argument::Statement(statement)), _, _) => Ok(statement),
            (Some(Argument::Text(query)), None, None) => Ok(Statement::new(query)),
            (Some(Argument::Text(query)), Some(Argument::Named(values)), None) => {
                Ok(Statement::with_named_values(query, values))
            }
            (Some(Argument::Text(query)), Some(Argument::Values(values)), None) => {
                Ok(Statement::with_values(query, values))
            }
            (first, second, third) => {
                let arguments = first
                    .into_iter()
                    .chain(second)
                    .chain(third)
                    .chain(iter)
                    .collect();
                Err(SessionError::UnsupportedArguments { arguments })
            }
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn values(&self) -> &BindValues {
        &self.values
    }

    /// Id of the prepared statement this statement was bound from.
    pub fn prepared_id(&self) -> Option<Uuid> {
        self.prepared_id
    }

    pub fn options(&self) -> &StatementOptions {
        &self.options
    }

    pub fn set_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.options.keyspace = Some(keyspace.into());
        self
    }

    pub fn set_consistency(mut self, consistency: Consistency) -> Self {
        self.options.consistency = Some(consistency);
        self
    }

    pub fn set_page_size(mut self, page_size: u32) -> Self {
        self.options.page_size = Some(page_size);
        self
    }

    pub fn set_idempotent(mut self, idempotent: bool) -> Self {
        self.options.idempotent = Some(idempotent);
        self
    }

    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn set_tracing(mut self, tracing: bool) -> Self {
        self.options.tracing = tracing;
        self
    }

    /// Whether this statement already carries an observation.
    pub fn is_observed(&self) -> bool {
        self.observation.is_some()
    }

    /// The observation carried by this statement, if any.
    pub fn observation(&self) -> Option<&Observation> {
        self.observation.as_ref()
    }

    /// Return this statement as a carrier of `observation`.
    ///
    /// Query, values and options are preserved. The carrier holds a handle to
    /// the observation but does not own stopping it.
    pub fn observed_by(self, observation: Observation) -> Statement {
        Statement {
            observation: Some(observation),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::ObservationRegistry;

    fn named(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_single_text_argument_builds_raw_statement() {
        let statement = Statement::from_arguments(vec!["SELECT * FROM t".into()]).unwrap();
        assert_eq!(statement.query(), "SELECT * FROM t");
        assert_eq!(statement.values(), &BindValues::None);
        assert!(!statement.is_observed());
    }

    #[test]
    fn test_text_with_mapping_builds_named_statement() {
        let values = named(&[("id", Value::Int(1))]);
        let statement = Statement::from_arguments(vec![
            "INSERT INTO t (id) VALUES (:id)".into(),
            Argument::Named(values.clone()),
        ])
        .unwrap();
        assert_eq!(statement.values(), &BindValues::Named(values));
    }

    #[test]
    fn test_text_with_sequence_builds_positional_statement() {
        let created_at = Utc::now();
        let statement = Statement::from_arguments(vec![
            "INSERT INTO t (id, name, created_at) VALUES (?, ?, ?)".into(),
            Argument::Values(vec![Value::Int(1), "alice".into(), created_at.into()]),
        ])
        .unwrap();
        assert_eq!(
            statement.values(),
            &BindValues::Positional(vec![
                Value::Int(1),
                Value::Text("alice".into()),
                Value::Timestamp(created_at),
            ])
        );
    }

    #[test]
    fn test_leading_statement_is_passed_through() {
        let original = Statement::new("SELECT now() FROM system.local")
            .set_page_size(50)
            .set_consistency(Consistency::LocalQuorum);
        let statement = Statement::from_arguments(vec![
            Argument::Statement(original.clone()),
            Argument::Value(Value::Int(7)),
        ])
        .unwrap();
        assert_eq!(statement.query(), original.query());
        assert_eq!(statement.options(), original.options());
    }

    #[test]
    fn test_unsupported_shapes_are_rejected() {
        let shapes: Vec<Vec<Argument>> = vec![
            vec![],
            vec![Argument::Value(Value::Int(1))],
            vec!["SELECT 1".into(), "SELECT 2".into()],
            vec!["SELECT 1".into(), Argument::Value(Value::Int(1))],
            vec![
                "SELECT ?".into(),
                Argument::Values(vec![Value::Int(1)]),
                Argument::Values(vec![Value::Int(2)]),
            ],
        ];

        for shape in shapes {
            let expected = shape.len();
            match Statement::from_arguments(shape) {
                Err(SessionError::UnsupportedArguments { arguments }) => {
                    assert_eq!(arguments.len(), expected);
                }
                other => panic!("expected UnsupportedArguments, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_observed_by_preserves_statement() {
        let registry = ObservationRegistry::noop();
        let observation = registry.create_not_started("execute", || unreachable!()).start();

        let original = Statement::with_values("SELECT * FROM t WHERE id = ?", vec![Value::Int(3)])
            .set_keyspace("shop")
            .set_idempotent(true)
            .set_timeout(Duration::from_millis(250))
            .set_tracing(true);
        let carrier = original.clone().observed_by(observation.clone());

        assert!(carrier.is_observed());
        assert!(!original.is_observed());
        assert_eq!(carrier.query(), original.query());
        assert_eq!(carrier.values(), original.values());
        assert_eq!(carrier.options(), original.options());
        assert_eq!(carrier.options().timeout, Some(Duration::from_millis(250)));
        assert!(carrier.options().tracing);
        assert_eq!(carrier.observation().map(|o| o.id()), Some(observation.id()));
    }
}
