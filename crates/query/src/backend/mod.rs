//! Query backend trait and implementations

pub mod clickhouse;

use async_trait::async_trait;

use crate::error::QueryError;
use crate::result::QueryResult;

/// A value bound to a named query parameter.
///
/// Caller-supplied values (team ids, property keys, search terms) must
/// never be interpolated into SQL text; they travel as bound parameters
/// and the backend is responsible for transmitting them out-of-band.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    UInt64(u64),
    Int64(i64),
}

impl ParamValue {
    /// ClickHouse type name used in `{name:Type}` placeholders
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::String(_) => "String",
            ParamValue::UInt64(_) => "UInt64",
            ParamValue::Int64(_) => "Int64",
        }
    }

    /// Wire representation of the value
    pub fn to_wire(&self) -> String {
        match self {
            ParamValue::String(s) => s.clone(),
            ParamValue::UInt64(n) => n.to_string(),
            ParamValue::Int64(n) => n.to_string(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<u64> for ParamValue {
    fn from(n: u64) -> Self {
        ParamValue::UInt64(n)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Int64(n)
    }
}

/// Query backend trait
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Execute a SQL query
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError>;

    /// Execute a SQL query with bound parameters
    ///
    /// The SQL may reference parameters with `{name:Type}` placeholders;
    /// `params` supplies the values in `(name, value)` pairs. Parameters
    /// not referenced by the SQL are permitted and ignored.
    async fn execute_with_params(
        &self,
        sql: &str,
        params: &[(&str, ParamValue)],
    ) -> Result<QueryResult, QueryError>;

    /// Check if backend is available
    async fn health_check(&self) -> Result<(), QueryError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Validate SQL query - only allow SELECT and WITH (CTE) queries
///
/// This is a guardrail to prevent accidental destructive queries.
/// The user is trusted (they have credentials), so this is not a
/// security boundary - just protection against mistakes.
pub fn validate_sql(sql: &str) -> Result<(), QueryError> {
    let trimmed = sql.trim();
    let upper = trimmed.to_uppercase();

    // Must start with SELECT or WITH (CTE)
    if !upper.starts_with("SELECT") && !upper.starts_with("WITH") {
        return Err(QueryError::InvalidSql(
            "only SELECT and WITH queries are allowed".to_string(),
        ));
    }

    // Block SELECT ... INTO (creates tables in some databases)
    if upper.contains(" INTO ") && !upper.contains("INSERT INTO") {
        return Err(QueryError::InvalidSql(
            "SELECT INTO is not allowed".to_string(),
        ));
    }

    // Disallow multiple statements (e.g., "SELECT 1; DROP TABLE x")
    // Allow trailing semicolon for convenience
    if trimmed.contains(';') && !trimmed.ends_with(';') {
        return Err(QueryError::InvalidSql(
            "multiple statements not allowed".to_string(),
        ));
    }

    Ok(())
}
