//! Naming and key-value conventions for observations.

use super::context::ObservationContext;

/// Attribute keys emitted by [`DefaultObservationConvention`].
pub mod keys {
    pub const DB_SYSTEM: &str = "db.system";
    pub const DB_OPERATION: &str = "db.operation";
    pub const DB_NAME: &str = "db.name";
    pub const DB_STATEMENT: &str = "db.statement";
    pub const SESSION_NAME: &str = "db.cassandra.session";
    pub const PREPARE: &str = "db.cassandra.prepare";
    pub const ASYNC: &str = "db.cassandra.async";
    pub const PEER_NAME: &str = "net.peer.name";
}

/// A single observation attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: &'static str,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Describes how an observation is named and tagged.
pub trait ObservationConvention: Send + Sync {
    /// Technical name of the observation, shared by all operations.
    fn name(&self) -> &str;

    /// Human-readable name for a specific operation.
    fn contextual_name(&self, context: &ObservationContext) -> String;

    /// Attributes with a bounded set of values (safe as metric labels).
    fn low_cardinality_key_values(&self, context: &ObservationContext) -> Vec<KeyValue>;

    /// Attributes with unbounded values (trace-only).
    fn high_cardinality_key_values(&self, context: &ObservationContext) -> Vec<KeyValue>;
}

/// Default convention: `cassandra.query` named, OTel-style keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultObservationConvention;

impl DefaultObservationConvention {
    pub const NAME: &'static str = "cassandra.query";
    pub const DB_SYSTEM: &'static str = "cassandra";
}

impl ObservationConvention for DefaultObservationConvention {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn contextual_name(&self, context: &ObservationContext) -> String {
        format!("{} {}", context.operation, context.keyspace)
    }

    fn low_cardinality_key_values(&self, context: &ObservationContext) -> Vec<KeyValue> {
        vec![
            KeyValue::new(keys::DB_SYSTEM, Self::DB_SYSTEM),
            KeyValue::new(keys::DB_OPERATION, context.operation.name()),
            KeyValue::new(keys::DB_NAME, context.keyspace.clone()),
            KeyValue::new(keys::SESSION_NAME, context.session_name.clone()),
            KeyValue::new(keys::PEER_NAME, context.remote_service_name.clone()),
            KeyValue::new(keys::PREPARE, context.is_prepare().to_string()),
            KeyValue::new(keys::ASYNC, context.is_async().to_string()),
        ]
    }

    fn high_cardinality_key_values(&self, context: &ObservationContext) -> Vec<KeyValue> {
        if context.statement_summary.is_empty() {
            return Vec::new();
        }
        vec![KeyValue::new(
            keys::DB_STATEMENT,
            context.statement_summary.clone(),
        )]
    }
}
