//! Abstract interfaces for the observation layer.
//!
//! These traits define the contracts for:
//! - CQL sessions (the delegate being observed)
//! - Request trackers (completion hooks invoked by a session)

pub mod session;

pub use session::{
    CqlSession, PreparedStatement, Reply, RequestTracker, Result, ResultSet, Row, SessionError,
};
