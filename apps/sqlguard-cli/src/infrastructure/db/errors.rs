use serde::Serialize;

/// Failures raised by a database transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The connection could not be opened or authenticated.
    #[error("{0}")]
    Connect(String),
    /// The server refused or failed the statement.
    #[error("{0}")]
    Query(String),
    /// A returned value could not be converted.
    #[error("{0}")]
    Decode(String),
}

/// Why a guarded execution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connectivity,
    DatabaseRejection,
    Timeout,
    Internal,
}

/// Execution failures, normalized into the result envelope by the guard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutionError {
    #[error("Database connection failed: {0}")]
    Connectivity(String),
    #[error("Database error: {0}")]
    DatabaseRejection(String),
    #[error("Query exceeded timeout of {seconds} seconds")]
    Timeout { seconds: u64 },
    #[error("Execution error: {0}")]
    Internal(String),
}

impl ExecutionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExecutionError::Connectivity(_) => FailureKind::Connectivity,
            ExecutionError::DatabaseRejection(_) => FailureKind::DatabaseRejection,
            ExecutionError::Timeout { .. } => FailureKind::Timeout,
            ExecutionError::Internal(_) => FailureKind::Internal,
        }
    }
}

impl From<TransportError> for ExecutionError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Connect(msg) => ExecutionError::Connectivity(msg),
            TransportError::Query(msg) => ExecutionError::DatabaseRejection(msg),
            TransportError::Decode(msg) => ExecutionError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let e = ExecutionError::Timeout { seconds: 1 };
        assert_eq!(e.to_string(), "Query exceeded timeout of 1 seconds");
        assert_eq!(e.kind(), FailureKind::Timeout);
    }

    #[test]
    fn test_transport_errors_map_to_taxonomy() {
        let e: ExecutionError = TransportError::Connect("refused".to_string()).into();
        assert_eq!(e.kind(), FailureKind::Connectivity);
        assert_eq!(e.to_string(), "Database connection failed: refused");

        let e: ExecutionError = TransportError::Query("Table 'x' doesn't exist".to_string()).into();
        assert_eq!(e.kind(), FailureKind::DatabaseRejection);
        assert_eq!(e.to_string(), "Database error: Table 'x' doesn't exist");
    }
}
