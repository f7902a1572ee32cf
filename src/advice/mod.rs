//! Aspect-oriented advice for CQL sessions.
//!
//! This module provides the wrapper that adds observations (timing,
//! tracing, failure recording) to session calls without touching the session
//! implementation.
//!
//! # Architecture
//!
//! Advice is applied at session composition time, not in implementations:
//!
//! ```ignore
//! // Core implementation - talks to the store
//! let session = InMemorySession::new("s0").with_tracker(Arc::new(ObservationRequestTracker));
//!
//! // Apply advice layers
//! let session = ObservationLayer::new(ObservationInterceptor::new("cassandra", registry))
//!     .layer(session);
//!
//! // Use as normal - observations are transparent
//! session.prepare(Statement::new("SELECT * FROM users WHERE id = ?"))?;
//! ```
//!
//! # Available Advice
//!
//! - [`ObservedSession`] - Observes `execute`, `prepare` and their async variants
//! - [`ObservationRequestTracker`] - Closes execute observations on completion

mod dispatch;
mod interceptor;
mod observed;
mod tracker;

pub use dispatch::{classify, Dispatch, Invocation};
pub use interceptor::ObservationInterceptor;
pub use observed::{ObservationLayer, ObservedSession};
pub use tracker::ObservationRequestTracker;
