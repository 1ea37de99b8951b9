//! Prism Query - SQL query execution for Prism session analytics
//!
//! Provides the executor interface the sessions compiler delegates to,
//! plus a ClickHouse implementation over the HTTP interface.
//!
//! # Usage
//!
//! ```ignore
//! use prism_query::{ClickHouseBackend, ParamValue, QueryBackend};
//!
//! let backend = ClickHouseBackend::from_url("http://localhost:8123", "default");
//! let result = backend
//!     .execute_with_params(
//!         "SELECT count(*) FROM sessions WHERE team_id = {team_id:UInt64}",
//!         &[("team_id", ParamValue::from(1u64))],
//!     )
//!     .await?;
//! println!("Rows: {}", result.row_count);
//! ```

pub mod backend;
pub mod error;
pub mod result;

// Re-exports
pub use backend::clickhouse::{ClickHouseBackend, ClickHouseBackendConfig};
pub use backend::{validate_sql, ParamValue, QueryBackend};
pub use error::QueryError;
pub use result::{Column, DataType, QueryResult};
