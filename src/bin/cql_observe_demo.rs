//! cql-observe-demo: Observation layer walkthrough
//!
//! Runs a few statements against an in-memory session wrapped in the
//! observation layer and prints the recorded observation events.
//!
//! ## Architecture
//! ```text
//! [demo] --> [ObservedSession] --> [InMemorySession] --(tracker)--> stop
//!                  |
//!                  v
//!        [tracing + recording handlers]
//! ```
//!
//! ## Configuration
//! - CQL_OBSERVATION_CONFIG: Path to a YAML config file (optional)
//! - CQL_OBSERVATION__*: Config overrides, e.g. CQL_OBSERVATION__REMOTE_SERVICE_NAME
//! - CQL_OBSERVATION_LOG: Log filter (default: info)

use std::sync::Arc;

use chrono::Utc;
use tower::Layer;
use tracing::{info, warn};

use cql_observation::advice::{ObservationLayer, ObservationRequestTracker};
use cql_observation::config::ObservationConfig;
use cql_observation::interfaces::{CqlSession, SessionError};
use cql_observation::observation::{
    ObservationRegistry, RecordingObservationHandler, TracingObservationHandler,
};
use cql_observation::session::InMemorySession;
use cql_observation::statement::{Statement, Value};
use cql_observation::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ObservationConfig::load(None)?;
    let recorder = Arc::new(RecordingObservationHandler::new());
    let registry = ObservationRegistry::noop()
        .with_handler(TracingObservationHandler)
        .with_shared_handler(recorder.clone());

    let session =
        InMemorySession::new("demo").with_tracker(Arc::new(ObservationRequestTracker));
    let observed = ObservationLayer::from_config(&config, registry).layer(session.clone());

    info!(remote_service_name = %config.remote_service_name, "cql-observe-demo started");

    observed.execute(Statement::new("USE shop"))?;
    let prepared = observed
        .prepare_async(Statement::new(
            "SELECT * FROM carts WHERE id = ? AND updated_at < ?",
        ))
        .await?;
    observed
        .execute_async(prepared.bind(vec![Value::Int(42), Utc::now().into()]))
        .await?;

    session.fail_next(SessionError::Timeout("demo coordinator".to_string()));
    if let Err(e) = observed
        .prepare_async(Statement::new("SELECT * FROM orders"))
        .await
    {
        warn!(error = %e, "Prepare failed as scripted");
    }

    for event in recorder.events() {
        println!(
            "{:<8} {:<14} {} {}",
            format!("{:?}", event.kind),
            event.name,
            event.id,
            event.failure.unwrap_or_default()
        );
    }

    observed.close().await?;
    Ok(())
}
