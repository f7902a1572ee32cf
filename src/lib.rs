//! cql-observation - Observation layer for CQL sessions
//!
//! Wraps a CQL session so that `execute`, `prepare` and their async variants
//! are measured and traced, without the caller or the session knowing.

pub mod advice;
pub mod config;
pub mod interfaces;
pub mod observation;
pub mod session;
pub mod statement;
pub mod utils;
