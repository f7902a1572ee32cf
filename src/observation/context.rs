//! Observation context: what an observation describes.

use std::fmt;

/// Session operations that are observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Execute,
    ExecuteAsync,
    Prepare,
    PrepareAsync,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Execute,
        OperationKind::ExecuteAsync,
        OperationKind::Prepare,
        OperationKind::PrepareAsync,
    ];

    /// Resolve an operation name into an observed kind.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Operation name, also used as the observation name.
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Execute => "execute",
            OperationKind::ExecuteAsync => "execute_async",
            OperationKind::Prepare => "prepare",
            OperationKind::PrepareAsync => "prepare_async",
        }
    }

    pub fn is_prepare(self) -> bool {
        matches!(self, OperationKind::Prepare | OperationKind::PrepareAsync)
    }

    pub fn is_async(self) -> bool {
        matches!(self, OperationKind::ExecuteAsync | OperationKind::PrepareAsync)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable description of one observed session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationContext {
    pub operation: OperationKind,
    /// Query text, possibly truncated. Empty when statement recording is off.
    pub statement_summary: String,
    pub session_name: String,
    /// Target keyspace, or the configured default when the session has none.
    pub keyspace: String,
    pub remote_service_name: String,
}

impl ObservationContext {
    pub fn is_prepare(&self) -> bool {
        self.operation.is_prepare()
    }

    pub fn is_async(&self) -> bool {
        self.operation.is_async()
    }
}

/// Shorten `query` to at most `max_length` bytes on a char boundary.
pub(crate) fn summarize(query: &str, max_length: usize) -> String {
    if query.len() <= max_length {
        return query.to_string();
    }
    let mut end = max_length;
    while !query.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &query[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_kind_names_round_trip() {
        for kind in OperationKind::ALL {
            assert_eq!(OperationKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(OperationKind::from_name("executeReactive"), None);
        assert_eq!(OperationKind::from_name("close"), None);
    }

    #[test]
    fn test_operation_kind_flags() {
        assert!(!OperationKind::Execute.is_prepare());
        assert!(!OperationKind::Execute.is_async());
        assert!(OperationKind::ExecuteAsync.is_async());
        assert!(OperationKind::Prepare.is_prepare());
        assert!(OperationKind::PrepareAsync.is_prepare());
        assert!(OperationKind::PrepareAsync.is_async());
    }

    #[test]
    fn test_summarize_keeps_short_queries() {
        assert_eq!(summarize("SELECT 1", 64), "SELECT 1");
    }

    #[test]
    fn test_summarize_truncates_on_char_boundary() {
        let query = "SELECT 'é' FROM t";
        // 'é' spans bytes 8..10
        assert_eq!(summarize(query, 9), "SELECT '...");
    }
}
