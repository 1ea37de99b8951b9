//! Physical and logical field registries for the sessions table
//!
//! Two registries exist because the storage representation (partial
//! aggregate states, one row per ingestion batch) intentionally diverges
//! from the exposed representation (finalized scalars, one row per
//! session). Both are fixed at process start and read-only.

use once_cell::sync::Lazy;

/// Semantic kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    DateTime,
    Boolean,
    StringArray,
    /// Opaque partial-aggregate state; must be merged, never read directly
    AggregateState,
}

/// A column of the physical (raw) sessions table
#[derive(Debug, Clone)]
pub struct PhysicalField {
    /// Name the field is addressed by
    pub name: &'static str,
    /// Storage column backing it
    pub column: &'static str,
    pub kind: FieldKind,
}

/// A field of the logical sessions table exposed to query callers
///
/// Names beginning with `$` are virtual (derived at query time); names
/// without it pass through to raw columns.
#[derive(Debug, Clone)]
pub struct LogicalField {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

const fn physical(name: &'static str, column: &'static str, kind: FieldKind) -> PhysicalField {
    PhysicalField { name, column, kind }
}

const fn logical(name: &'static str, kind: FieldKind, nullable: bool) -> LogicalField {
    LogicalField {
        name,
        column: name,
        kind,
        nullable,
    }
}

static PHYSICAL_FIELDS: Lazy<Vec<PhysicalField>> = Lazy::new(|| {
    use FieldKind::*;
    vec![
        physical("id", "session_id", String),
        // duplicate of session_id below, kept so dashboards addressing
        // either name keep working
        physical("session_id", "session_id", String),
        physical("team_id", "team_id", Integer),
        physical("distinct_id", "distinct_id", String),
        physical("min_timestamp", "min_timestamp", DateTime),
        physical("max_timestamp", "max_timestamp", DateTime),
        // URLs / paths
        physical("urls", "urls", StringArray),
        // most attribution columns are AggregateFunction state, not
        // simple types
        physical("entry_url", "entry_url", AggregateState),
        physical("exit_url", "exit_url", AggregateState),
        physical(
            "initial_referring_domain",
            "initial_referring_domain",
            AggregateState,
        ),
        // UTM parameters
        physical("initial_utm_source", "initial_utm_source", AggregateState),
        physical(
            "initial_utm_campaign",
            "initial_utm_campaign",
            AggregateState,
        ),
        physical("initial_utm_medium", "initial_utm_medium", AggregateState),
        physical("initial_utm_term", "initial_utm_term", AggregateState),
        physical("initial_utm_content", "initial_utm_content", AggregateState),
        // Other ad / campaign / attribution IDs
        physical("initial_gclid", "initial_gclid", AggregateState),
        physical("initial_gad_source", "initial_gad_source", AggregateState),
        physical("initial_gclsrc", "initial_gclsrc", AggregateState),
        physical("initial_dclid", "initial_dclid", AggregateState),
        physical("initial_gbraid", "initial_gbraid", AggregateState),
        physical("initial_wbraid", "initial_wbraid", AggregateState),
        physical("initial_fbclid", "initial_fbclid", AggregateState),
        physical("initial_msclkid", "initial_msclkid", AggregateState),
        physical("initial_twclid", "initial_twclid", AggregateState),
        physical("initial_li_fat_id", "initial_li_fat_id", AggregateState),
        physical("initial_mc_cid", "initial_mc_cid", AggregateState),
        physical("initial_igshid", "initial_igshid", AggregateState),
        physical("initial_ttclid", "initial_ttclid", AggregateState),
        // Counts (used in e.g. bounce rate)
        physical("event_count_map", "event_count_map", AggregateState),
        physical("pageview_count", "pageview_count", Integer),
        physical("autocapture_count", "autocapture_count", Integer),
    ]
});

static LOGICAL_FIELDS: Lazy<Vec<LogicalField>> = Lazy::new(|| {
    use FieldKind::*;
    vec![
        LogicalField {
            name: "id",
            column: "session_id",
            kind: String,
            nullable: false,
        },
        // duplicate of the id field above, kept so dashboards addressing
        // either name keep working
        logical("session_id", String, false),
        logical("team_id", Integer, false),
        logical("distinct_id", String, false),
        logical("$start_timestamp", DateTime, false),
        logical("$end_timestamp", DateTime, false),
        // URLs / paths
        logical("$urls", StringArray, false),
        logical("$num_uniq_urls", Integer, false),
        logical("$entry_current_url", String, true),
        logical("$entry_pathname", String, true),
        LogicalField {
            name: "$entry_hostname",
            column: "$entry_host",
            kind: String,
            nullable: true,
        },
        logical("$exit_current_url", String, true),
        logical("$exit_pathname", String, true),
        LogicalField {
            name: "$exit_hostname",
            column: "$exit_host",
            kind: String,
            nullable: true,
        },
        logical("$entry_referring_domain", String, true),
        // UTM parameters
        logical("$entry_utm_source", String, true),
        logical("$entry_utm_campaign", String, true),
        logical("$entry_utm_medium", String, true),
        logical("$entry_utm_term", String, true),
        logical("$entry_utm_content", String, true),
        // Other ad / campaign / attribution IDs
        logical("$entry_gclid", String, true),
        logical("$entry_gad_source", String, true),
        logical("$entry_gclsrc", String, true),
        logical("$entry_dclid", String, true),
        logical("$entry_gbraid", String, true),
        logical("$entry_wbraid", String, true),
        logical("$entry_fbclid", String, true),
        logical("$entry_msclkid", String, true),
        logical("$entry_twclid", String, true),
        logical("$entry_li_fat_id", String, true),
        logical("$entry_mc_cid", String, true),
        logical("$entry_igshid", String, true),
        logical("$entry_ttclid", String, true),
        // Counts (used in e.g. bounce rate)
        logical("$event_count_map", AggregateState, true),
        logical("$pageview_count", Integer, true),
        logical("$autocapture_count", Integer, true),
        // Derived
        logical("$channel_type", String, true),
        logical("$session_duration", Integer, true),
        // alias of $session_duration, deprecated but kept for backwards
        // compatibility
        logical("duration", Integer, true),
        logical("$is_bounce", Boolean, true),
        // aliases for callers reverting from the v2 schema
        logical("$end_current_url", String, true),
        logical("$end_pathname", String, true),
    ]
});

/// Columns of the physical table, in registry order
pub fn physical_fields() -> &'static [PhysicalField] {
    &PHYSICAL_FIELDS
}

/// Fields of the logical table, in registry order
pub fn logical_fields() -> &'static [LogicalField] {
    &LOGICAL_FIELDS
}

/// Look up a logical field by its exposed name
pub fn logical_field(name: &str) -> Option<&'static LogicalField> {
    LOGICAL_FIELDS.iter().find(|f| f.name == name)
}

/// Raw-table fields excluded from `SELECT *` expansion
///
/// The ClickHouse driver cannot return aggregate states, so every
/// state-typed column is kept out of asterisk expansion.
pub const RAW_AVOID_ASTERISK_FIELDS: &[&str] = &[
    "entry_url",
    "exit_url",
    "initial_utm_source",
    "initial_utm_campaign",
    "initial_utm_medium",
    "initial_utm_term",
    "initial_utm_content",
    "initial_referring_domain",
    "initial_gclid",
    "initial_gad_source",
    "initial_gclsrc",
    "initial_dclid",
    "initial_gbraid",
    "initial_wbraid",
    "initial_fbclid",
    "initial_msclkid",
    "initial_twclid",
    "initial_li_fat_id",
    "initial_mc_cid",
    "initial_igshid",
    "initial_ttclid",
];

/// Logical-table fields excluded from `SELECT *` expansion
///
/// These are pure aliases of other fields; expanding them alongside their
/// targets would select the same value twice.
pub const AVOID_ASTERISK_FIELDS: &[&str] = &[
    "duration",
    // aliases for callers reverting from the v2 schema
    "$end_current_url",
    "$end_pathname",
];
