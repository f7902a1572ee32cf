//! Process-level helpers.

pub mod bootstrap;
#[cfg(feature = "otel")]
pub mod metrics;
