//! Session compiler error types

use thiserror::Error;

/// Errors raised by the sessions layer
#[derive(Debug, Error)]
pub enum SessionsError {
    /// A join or field reference could not be resolved
    #[error("resolution failed: {0}")]
    Resolution(String),

    /// Backend error (from prism-query)
    #[error("backend error: {0}")]
    Backend(#[from] prism_query::QueryError),
}

/// Result type for session compiler operations
pub type Result<T> = std::result::Result<T, SessionsError>;
