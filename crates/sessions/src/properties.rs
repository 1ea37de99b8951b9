//! Property catalog and value resolution
//!
//! Exposes the logical field catalog as browsable property metadata for
//! filtering UIs, and resolves distinct values for a property by
//! delegating to the storage executor. Caller-supplied search terms only
//! ever travel as bound query parameters.

use serde::Serialize;

use prism_query::{ParamValue, QueryBackend};

use crate::catalog::{logical_field, logical_fields, FieldKind};
use crate::channel::CHANNEL_TYPES;
use crate::error::Result;

/// Display type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum PropertyType {
    String,
    Numeric,
    Boolean,
    DateTime,
    Duration,
}

/// Catalog metadata for one logical field
///
/// Built fresh per catalog query, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyDescriptor {
    pub id: String,
    pub name: String,
    pub is_numerical: bool,
    pub property_type: PropertyType,
    pub tags: Vec<String>,
}

/// Fields that should not appear as user-facing properties: internal
/// ids, raw maps and URL arrays, and the pure aliases
const HIDDEN_PROPERTY_FIELDS: &[&str] = &[
    "team_id",
    "distinct_id",
    "session_id",
    "id",
    "$event_count_map",
    "$urls",
    "duration",
    "$num_uniq_urls",
    // aliases for callers reverting from the v2 schema
    "$end_current_url",
    "$end_pathname",
];

fn property_type(name: &str, kind: FieldKind) -> PropertyType {
    // the duration field renders as a humanized duration, which is not
    // derivable from its integer storage kind
    if name == "$session_duration" {
        return PropertyType::Duration;
    }
    match kind {
        FieldKind::Integer | FieldKind::Float => PropertyType::Numeric,
        FieldKind::DateTime => PropertyType::DateTime,
        FieldKind::Boolean => PropertyType::Boolean,
        _ => PropertyType::String,
    }
}

fn search_words(search: Option<&str>) -> Vec<String> {
    search
        .map(|s| {
            s.to_lowercase()
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// List user-facing session properties, optionally filtered by search term
///
/// Search is AND-of-tokens: every whitespace-delimited lowercase token of
/// the term must appear as a substring of the field name.
pub fn list_properties(search: Option<&str>) -> Vec<PropertyDescriptor> {
    let words = search_words(search);

    logical_fields()
        .iter()
        .filter(|field| !HIDDEN_PROPERTY_FIELDS.contains(&field.name))
        .filter(|field| {
            let name = field.name.to_lowercase();
            words.iter().all(|word| name.contains(word))
        })
        .map(|field| PropertyDescriptor {
            id: field.name.to_string(),
            name: field.name.to_string(),
            is_numerical: matches!(field.kind, FieldKind::Integer | FieldKind::Float),
            property_type: property_type(field.name, field.kind),
            tags: Vec::new(),
        })
        .collect()
}

// =============================================================================
// Value resolution
// =============================================================================

/// Raw-table expression per string property, used for value lookups
/// against the physical table without going through the compiler
const PROPERTY_VALUE_EXPRS: &[(&str, &str)] = &[
    (
        "$entry_referring_domain",
        "finalizeAggregation(initial_referring_domain)",
    ),
    ("$entry_utm_source", "finalizeAggregation(initial_utm_source)"),
    (
        "$entry_utm_campaign",
        "finalizeAggregation(initial_utm_campaign)",
    ),
    ("$entry_utm_medium", "finalizeAggregation(initial_utm_medium)"),
    ("$entry_utm_term", "finalizeAggregation(initial_utm_term)"),
    (
        "$entry_utm_content",
        "finalizeAggregation(initial_utm_content)",
    ),
    ("$entry_gclid", "finalizeAggregation(initial_gclid)"),
    ("$entry_gad_source", "finalizeAggregation(initial_gad_source)"),
    ("$entry_gclsrc", "finalizeAggregation(initial_gclsrc)"),
    ("$entry_dclid", "finalizeAggregation(initial_dclid)"),
    ("$entry_gbraid", "finalizeAggregation(initial_gbraid)"),
    ("$entry_wbraid", "finalizeAggregation(initial_wbraid)"),
    ("$entry_fbclid", "finalizeAggregation(initial_fbclid)"),
    ("$entry_msclkid", "finalizeAggregation(initial_msclkid)"),
    ("$entry_twclid", "finalizeAggregation(initial_twclid)"),
    ("$entry_li_fat_id", "finalizeAggregation(initial_li_fat_id)"),
    ("$entry_mc_cid", "finalizeAggregation(initial_mc_cid)"),
    ("$entry_igshid", "finalizeAggregation(initial_igshid)"),
    ("$entry_ttclid", "finalizeAggregation(initial_ttclid)"),
    ("$entry_current_url", "finalizeAggregation(entry_url)"),
    ("$exit_current_url", "finalizeAggregation(exit_url)"),
];

/// Most frequent values of a property, team-scoped
const SELECT_STRING_VALUES_SQL: &str = "\
SELECT value, count(value) AS cnt FROM (\
 SELECT {property_expr} AS value FROM sessions \
 WHERE team_id = {team_id:UInt64} AND isNotNull(value) AND value != '' \
 ORDER BY session_id DESC LIMIT 100000\
) GROUP BY value ORDER BY cnt DESC LIMIT 20";

/// Same, restricted to values containing the search term
const SELECT_STRING_VALUES_SQL_WITH_FILTER: &str = "\
SELECT value, count(value) AS cnt FROM (\
 SELECT {property_expr} AS value FROM sessions \
 WHERE team_id = {team_id:UInt64} AND isNotNull(value) AND value != '' \
 AND value ILIKE {value:String} \
 ORDER BY session_id DESC LIMIT 100000\
) GROUP BY value ORDER BY cnt DESC LIMIT 20";

fn property_value_expr(key: &str) -> Option<&'static str> {
    PROPERTY_VALUE_EXPRS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, expr)| *expr)
}

/// Resolve distinct values for a logical field
///
/// Channel type and boolean fields answer from fixed sets without a
/// storage round-trip. String fields with a known raw expression delegate
/// to the executor; anything else yields an empty list - a deliberate
/// "unsupported, not an error" outcome.
pub async fn list_values(
    backend: &dyn QueryBackend,
    key: &str,
    search: Option<&str>,
    team_id: u64,
) -> Result<Vec<String>> {
    if key == "$channel_type" {
        let needle = search.map(|s| s.to_lowercase());
        return Ok(CHANNEL_TYPES
            .iter()
            .filter(|label| {
                needle
                    .as_deref()
                    .is_none_or(|n| label.to_lowercase().contains(n))
            })
            .map(|label| label.to_string())
            .collect());
    }

    // the sessions table has no free-form properties object; only
    // catalogued fields resolve
    let Some(field) = logical_field(key) else {
        return Ok(Vec::new());
    };

    match field.kind {
        FieldKind::Boolean => Ok(vec!["1".to_string(), "0".to_string()]),
        FieldKind::String => {
            let Some(expr) = property_value_expr(key) else {
                return Ok(Vec::new());
            };

            let mut params = vec![
                ("team_id", ParamValue::from(team_id)),
                ("key", ParamValue::from(key)),
            ];
            let sql = match search {
                Some(term) => {
                    params.push(("value", ParamValue::from(format!("%{}%", term))));
                    SELECT_STRING_VALUES_SQL_WITH_FILTER.replace("{property_expr}", expr)
                }
                None => SELECT_STRING_VALUES_SQL.replace("{property_expr}", expr),
            };

            tracing::debug!(key, team_id, "resolving session property values");

            let result = backend.execute_with_params(&sql, &params).await?;

            Ok(result
                .rows
                .iter()
                .filter_map(|row| row.first().and_then(|v| v.as_str()).map(String::from))
                .collect())
        }
        _ => Ok(Vec::new()),
    }
}
