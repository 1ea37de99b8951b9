//! Prism Sessions - logical-to-physical query compiler for the sessions table
//!
//! Sessions are ingested as per-batch partial aggregate states into a
//! physically-partitioned ClickHouse table; this crate compiles requests
//! for logical session fields (entry/exit URLs, UTM attribution, bounce
//! flag, channel type, durations) into one grouped aggregate select that
//! merges those states and derives the higher-level fields.
//!
//! # Overview
//!
//! - **Catalog**: physical and logical field registries
//! - **Classifiers**: marketing channel attribution and bounce detection
//! - **Aggregates**: expression builder mapping logical names to merge
//!   expressions over physical columns
//! - **Compile**: grouped select construction with minimal grouping key
//! - **Join**: left-join fragments for the events entity
//! - **Properties**: browsable catalog metadata and value lookups
//!
//! # Usage
//!
//! ```ignore
//! use prism_sessions::{requested, select_from_sessions, QueryModifiers};
//!
//! let query = select_from_sessions(
//!     &[requested("$channel_type"), requested("$is_bounce")],
//!     None,
//!     &QueryModifiers::default(),
//! );
//! assert_eq!(query.from_table, "sessions");
//! ```
//!
//! All compilation is pure and synchronous; the only blocking operation
//! is [`properties::list_values`], which delegates to the storage
//! executor.

pub mod aggregates;
pub mod bounce;
pub mod catalog;
pub mod channel;
pub mod compile;
pub mod error;
pub mod expr;
pub mod join;
pub mod modifiers;
pub mod properties;

#[cfg(test)]
mod aggregates_test;
#[cfg(test)]
mod properties_test;

// Re-exports for convenience
pub use aggregates::{aggregate_fields, AggregateFields, SESSIONS_TABLE};
pub use bounce::{bounce_expr, BounceFlag};
pub use catalog::{logical_fields, physical_fields, FieldKind, LogicalField, PhysicalField};
pub use channel::{
    channel_type_expr, classify, ChannelInputs, ChannelType, ChannelTypeExprs, CustomChannelRule,
    CHANNEL_TYPES,
};
pub use compile::{requested, select_from_sessions, CompiledQuery, RequestedField, SelectItem};
pub use error::{Result, SessionsError};
pub use expr::{ChainSegment, Expr, MergeKind, ScalarFunc, Value};
pub use join::{join_events_to_sessions, JoinFragment};
pub use modifiers::{
    BounceRatePageViewMode, QueryModifiers, DEFAULT_BOUNCE_RATE_DURATION_SECONDS,
};
pub use properties::{list_properties, list_values, PropertyDescriptor, PropertyType};
