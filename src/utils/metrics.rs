//! OTel-native metrics instruments.
//!
//! Centralized metric definitions using OpenTelemetry meters.
//! All instruments are lazily initialized and feature-gated behind `otel`.
//!
//! Naming follows OTel semantic conventions (dot-separated).
//! The OTel Collector / Prometheus exporter converts dots to underscores.

use std::sync::LazyLock;

use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{global, KeyValue};

use crate::observation::KeyValue as ObservationKeyValue;

static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("cql_observation"));

// ============================================================================
// Session Operations
// ============================================================================

/// Duration of observed session operations (execute, prepare and async variants).
pub static QUERY_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("cassandra.query.duration")
        .with_description("Observed CQL operation duration")
        .with_unit("s")
        .build()
});

/// Total observed session operations.
pub static QUERY_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("cassandra.query.total")
        .with_description("Total observed CQL operations")
        .build()
});

// ============================================================================
// Helper
// ============================================================================

/// Convert an observation key value into an OTel attribute.
pub fn key_value_attr(kv: &ObservationKeyValue) -> KeyValue {
    KeyValue::new(kv.key, kv.value.clone())
}

/// Create an outcome label.
pub fn outcome_attr(outcome: &str) -> KeyValue {
    KeyValue::new("outcome", outcome.to_string())
}
