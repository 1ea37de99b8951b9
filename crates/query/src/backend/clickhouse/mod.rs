//! ClickHouse backend for querying session analytics data
//!
//! Executes SQL queries against a ClickHouse database using the HTTP
//! interface. Bound parameters are transmitted as `param_*` request
//! parameters, never spliced into the SQL text.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;

use crate::backend::{validate_sql, ParamValue, QueryBackend};
use crate::error::QueryError;
use crate::result::{Column, DataType, QueryResult};

// =============================================================================
// Configuration
// =============================================================================

/// ClickHouse backend configuration
#[derive(Debug, Clone)]
pub struct ClickHouseBackendConfig {
    /// ClickHouse HTTP URL (e.g., "http://localhost:8123")
    pub url: String,

    /// Database name
    pub database: String,

    /// Username for authentication (optional)
    pub username: Option<String>,

    /// Password for authentication (optional)
    pub password: Option<String>,

    /// Max execution time in seconds
    pub max_execution_time: u64,
}

impl Default for ClickHouseBackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".into(),
            database: "default".into(),
            username: None,
            password: None,
            max_execution_time: 60,
        }
    }
}

impl ClickHouseBackendConfig {
    /// Create a new config with URL and database
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Default::default()
        }
    }

    /// Set authentication credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

// =============================================================================
// Backend Implementation
// =============================================================================

/// ClickHouse backend for SQL queries using HTTP interface
#[derive(Clone)]
pub struct ClickHouseBackend {
    client: reqwest::Client,
    config: ClickHouseBackendConfig,
}

impl std::fmt::Debug for ClickHouseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseBackend")
            .field("url", &self.config.url)
            .field("database", &self.config.database)
            .finish()
    }
}

impl ClickHouseBackend {
    /// Create a new ClickHouse backend from config
    pub fn new(config: &ClickHouseBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    /// Create from URL and database directly
    pub fn from_url(url: impl Into<String>, database: impl Into<String>) -> Self {
        let config = ClickHouseBackendConfig::new(url, database);
        Self::new(&config)
    }

    /// Build the request URL, with bound parameters as `param_*` entries
    fn build_url(&self, params: &[(&str, ParamValue)]) -> String {
        let mut url = format!(
            "{}/?database={}&max_execution_time={}",
            self.config.url, self.config.database, self.config.max_execution_time
        );

        for (name, value) in params {
            url.push_str("&param_");
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(&value.to_wire()));
        }

        url
    }

    /// Execute a query and get raw response text
    ///
    /// The SQL is sent as the POST body so it never needs URL escaping.
    async fn execute_query(
        &self,
        sql: &str,
        params: &[(&str, ParamValue)],
    ) -> Result<String, QueryError> {
        let url = self.build_url(params);

        let mut request = self.client.post(&url).body(sql.to_string());

        // Add authentication if configured
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| QueryError::Connection(format!("ClickHouse connection failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Execution(format!(
                "ClickHouse error ({}): {}",
                status, body
            )));
        }

        response
            .text()
            .await
            .map_err(|e| QueryError::Execution(format!("failed to read response: {}", e)))
    }

    async fn run(
        &self,
        sql: &str,
        params: &[(&str, ParamValue)],
    ) -> Result<QueryResult, QueryError> {
        validate_sql(sql)?;

        let start = Instant::now();

        // Execute query with JSON format; its meta section carries the
        // server-side column types
        let query_with_format = format!("{} FORMAT JSON", sql.trim().trim_end_matches(';'));
        let response_text = self.execute_query(&query_with_format, params).await?;

        let execution_time_ms = start.elapsed().as_millis() as u64;

        if response_text.trim().is_empty() {
            return Ok(QueryResult::new(Vec::new(), Vec::new(), execution_time_ms));
        }

        let response: JsonResponse = serde_json::from_str(&response_text).map_err(|e| {
            QueryError::Serialization(format!("failed to parse JSON response: {}", e))
        })?;

        let columns: Vec<Column> = response
            .meta
            .iter()
            .map(|col| {
                Column::new(
                    col.name.clone(),
                    clickhouse_type_to_datatype(&col.r#type),
                    col.r#type.contains("Nullable"),
                )
            })
            .collect();

        // Extract row values in meta column order
        let rows: Vec<Vec<serde_json::Value>> = response
            .data
            .iter()
            .map(|row| {
                response
                    .meta
                    .iter()
                    .map(|col| row.get(&col.name).cloned().unwrap_or(serde_json::Value::Null))
                    .collect()
            })
            .collect();

        tracing::debug!(
            rows = rows.len(),
            cols = columns.len(),
            time_ms = execution_time_ms,
            "ClickHouse query executed"
        );

        Ok(QueryResult::new(columns, rows, execution_time_ms))
    }
}

#[async_trait]
impl QueryBackend for ClickHouseBackend {
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        self.run(sql, &[]).await
    }

    async fn execute_with_params(
        &self,
        sql: &str,
        params: &[(&str, ParamValue)],
    ) -> Result<QueryResult, QueryError> {
        self.run(sql, params).await
    }

    async fn health_check(&self) -> Result<(), QueryError> {
        self.execute_query("SELECT 1", &[]).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "clickhouse"
    }
}

// =============================================================================
// Helper Types
// =============================================================================

/// `FORMAT JSON` response envelope
#[derive(Debug, Deserialize)]
struct JsonResponse {
    #[serde(default)]
    meta: Vec<MetaColumn>,
    #[serde(default)]
    data: Vec<HashMap<String, serde_json::Value>>,
}

/// Column entry of the response meta section
#[derive(Debug, Deserialize)]
struct MetaColumn {
    name: String,
    r#type: String,
}

// =============================================================================
// Type Conversion
// =============================================================================

/// Convert ClickHouse type string to DataType
///
/// The sessions table stores `AggregateFunction(...)` columns; those map to
/// an opaque state type rather than their finalized scalar type.
pub fn clickhouse_type_to_datatype(ch_type: &str) -> DataType {
    if ch_type.starts_with("AggregateFunction(") {
        return DataType::AggregateState;
    }

    // Strip Nullable wrapper
    let inner_type = ch_type
        .strip_prefix("Nullable(")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(ch_type);

    // Strip LowCardinality wrapper
    let inner_type = inner_type
        .strip_prefix("LowCardinality(")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(inner_type);

    match inner_type {
        // Integers
        "Int8" | "Int16" | "Int32" | "Int64" | "Int128" | "Int256" => DataType::Int64,
        "UInt8" | "UInt16" | "UInt32" | "UInt64" | "UInt128" | "UInt256" => DataType::UInt64,

        // Floats
        "Float32" | "Float64" => DataType::Float64,

        // Strings
        "String" | "FixedString" => DataType::String,
        t if t.starts_with("FixedString(") => DataType::String,
        t if t.starts_with("Enum") => DataType::String,

        t if t.starts_with("UUID") => DataType::String,
        t if t.starts_with("IPv") => DataType::String,

        // Boolean
        "Bool" => DataType::Boolean,

        // Timestamps
        "Date" | "Date32" => DataType::Timestamp,
        t if t.starts_with("DateTime") => DataType::Timestamp,

        // JSON/Complex
        "JSON" => DataType::Json,
        t if t.starts_with("Array(") => DataType::Json,
        t if t.starts_with("Map(") => DataType::Json,
        t if t.starts_with("Tuple(") => DataType::Json,

        // Default
        _ => DataType::Unknown,
    }
}

/// URL encoding helper
mod urlencoding {
    pub fn encode(s: &str) -> String {
        let mut result = String::with_capacity(s.len() * 3);
        for c in s.chars() {
            match c {
                'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => {
                    result.push(c);
                }
                ' ' => result.push_str("%20"),
                _ => {
                    for byte in c.to_string().as_bytes() {
                        result.push_str(&format!("%{:02X}", byte));
                    }
                }
            }
        }
        result
    }
}
