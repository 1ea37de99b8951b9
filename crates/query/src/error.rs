//! Query error types

/// Errors that can occur during query execution
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// Query execution failed
    #[error("query execution failed: {0}")]
    Execution(String),

    /// Invalid SQL (only SELECT/WITH allowed)
    #[error("invalid SQL: {0}")]
    InvalidSql(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Serialization(err.to_string())
    }
}
