use thiserror::Error;

/// Error type for pgfluent operations
#[derive(Debug, Clone, Error)]
pub enum PgFluentError {
    /// A column, table or query was declared inconsistently. Raised before any SQL is sent.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A query was asked for a result shape it cannot produce.
    #[error("Query shape error: {0}")]
    QueryShape(String),

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Unique violation on {constraint}: {message}")]
    UniqueViolation { constraint: String, message: String },

    #[error("Constraint violation on {constraint}: {message}")]
    ConstraintViolation { constraint: String, message: String },

    #[error("Unsupported column type: {0}")]
    UnsupportedType(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database interface has not been started")]
    NotStarted,
}

impl PgFluentError {
    /// True when the failure came from a broken or unreachable connection,
    /// the only class of error the driver retries.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, PgFluentError::ConnectionFailed(_))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, PgFluentError::UniqueViolation { .. })
    }

    /// True for any integrity constraint violation, unique ones included.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            PgFluentError::UniqueViolation { .. } | PgFluentError::ConstraintViolation { .. }
        )
    }
}

/// Result type alias for pgfluent operations
pub type Result<T> = std::result::Result<T, PgFluentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let unique = PgFluentError::UniqueViolation {
            constraint: "users_pkey".to_string(),
            message: "duplicate key".to_string(),
        };
        assert!(unique.is_unique_violation());
        assert!(unique.is_constraint_violation());
        assert!(!unique.is_connection_error());

        let broken = PgFluentError::ConnectionFailed("connection closed".to_string());
        assert!(broken.is_connection_error());
        assert!(!broken.is_constraint_violation());

        assert!(!PgFluentError::Schema("bad".to_string()).is_connection_error());
    }
}
