//! Tests for the property catalog and value resolver

use async_trait::async_trait;
use std::sync::Mutex;

use prism_query::{Column, DataType, ParamValue, QueryBackend, QueryError, QueryResult};

use crate::properties::*;

// =============================================================================
// Catalog listing
// =============================================================================

fn names(descriptors: &[PropertyDescriptor]) -> Vec<&str> {
    descriptors.iter().map(|d| d.name.as_str()).collect()
}

#[test]
fn test_list_all_hides_internal_fields() {
    let properties = list_properties(None);
    let names = names(&properties);

    assert!(names.contains(&"$channel_type"));
    assert!(names.contains(&"$entry_utm_source"));
    assert!(names.contains(&"$is_bounce"));

    for hidden in [
        "team_id",
        "distinct_id",
        "session_id",
        "id",
        "$event_count_map",
        "$urls",
        "duration",
        "$num_uniq_urls",
        "$end_current_url",
        "$end_pathname",
    ] {
        assert!(!names.contains(&hidden), "{} should be hidden", hidden);
    }
}

#[test]
fn test_search_requires_every_token() {
    let properties = list_properties(Some("utm source"));
    let names = names(&properties);

    assert_eq!(names, vec!["$entry_utm_source"]);
}

#[test]
fn test_search_is_case_insensitive_substring() {
    let properties = list_properties(Some("UTM"));
    let names = names(&properties);

    assert!(names.contains(&"$entry_utm_source"));
    assert!(names.contains(&"$entry_utm_campaign"));
    assert!(names.contains(&"$entry_utm_medium"));
    assert!(names.contains(&"$entry_utm_term"));
    assert!(names.contains(&"$entry_utm_content"));
    assert_eq!(names.len(), 5);
}

#[test]
fn test_search_excludes_hidden_even_on_match() {
    let properties = list_properties(Some("urls"));
    let names = names(&properties);

    assert!(!names.contains(&"$urls"));
    assert!(!names.contains(&"$num_uniq_urls"));
}

#[test]
fn test_search_with_no_match_is_empty() {
    assert!(list_properties(Some("xyzzy")).is_empty());
}

#[test]
fn test_property_types() {
    let properties = list_properties(None);
    let get = |name: &str| {
        properties
            .iter()
            .find(|d| d.name == name)
            .unwrap_or_else(|| panic!("{} listed", name))
    };

    // duration override beats the integer storage kind
    let duration = get("$session_duration");
    assert_eq!(duration.property_type, PropertyType::Duration);
    assert!(duration.is_numerical);

    assert_eq!(get("$is_bounce").property_type, PropertyType::Boolean);
    assert_eq!(get("$start_timestamp").property_type, PropertyType::DateTime);
    assert_eq!(get("$pageview_count").property_type, PropertyType::Numeric);
    assert_eq!(get("$channel_type").property_type, PropertyType::String);
}

#[test]
fn test_descriptor_id_matches_name() {
    for descriptor in list_properties(None) {
        assert_eq!(descriptor.id, descriptor.name);
        assert!(descriptor.tags.is_empty());
    }
}

// =============================================================================
// Value resolution
// =============================================================================

/// Records executed queries and replays a canned result
struct RecordingBackend {
    calls: Mutex<Vec<(String, Vec<(String, ParamValue)>)>>,
    rows: Vec<Vec<serde_json::Value>>,
}

impl RecordingBackend {
    fn new(rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            rows,
        }
    }

    fn empty() -> Self {
        Self::new(Vec::new())
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn last_call(&self) -> (String, Vec<(String, ParamValue)>) {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl QueryBackend for RecordingBackend {
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        self.execute_with_params(sql, &[]).await
    }

    async fn execute_with_params(
        &self,
        sql: &str,
        params: &[(&str, ParamValue)],
    ) -> Result<QueryResult, QueryError> {
        self.calls.lock().unwrap().push((
            sql.to_string(),
            params
                .iter()
                .map(|(n, v)| (n.to_string(), v.clone()))
                .collect(),
        ));
        Ok(QueryResult::new(
            vec![
                Column::new("value", DataType::String, true),
                Column::new("cnt", DataType::UInt64, false),
            ],
            self.rows.clone(),
            1,
        ))
    }

    async fn health_check(&self) -> Result<(), QueryError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[tokio::test]
async fn test_channel_type_answers_without_storage() {
    let backend = RecordingBackend::empty();

    let values = list_values(&backend, "$channel_type", None, 1).await.unwrap();
    assert_eq!(values.len(), crate::channel::CHANNEL_TYPES.len());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_channel_type_search_filters_labels() {
    let backend = RecordingBackend::empty();

    let values = list_values(&backend, "$channel_type", Some("paid"), 1)
        .await
        .unwrap();
    assert_eq!(values, vec!["Paid Search", "Paid Social"]);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_boolean_field_returns_canonical_literals() {
    let backend = RecordingBackend::empty();

    let values = list_values(&backend, "$is_bounce", None, 1).await.unwrap();
    assert_eq!(values, vec!["1", "0"]);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_string_field_delegates_with_bound_params() {
    let backend = RecordingBackend::new(vec![
        vec![serde_json::json!("google"), serde_json::json!(12)],
        vec![serde_json::json!("bing"), serde_json::json!(3)],
    ]);

    let values = list_values(&backend, "$entry_utm_source", None, 7)
        .await
        .unwrap();
    assert_eq!(values, vec!["google", "bing"]);

    let (sql, params) = backend.last_call();
    assert!(sql.contains("finalizeAggregation(initial_utm_source)"));
    assert!(sql.contains("{team_id:UInt64}"));
    assert_eq!(params[0], ("team_id".to_string(), ParamValue::from(7u64)));
    assert_eq!(
        params[1],
        ("key".to_string(), ParamValue::from("$entry_utm_source"))
    );
}

#[tokio::test]
async fn test_string_field_search_binds_like_pattern() {
    let backend = RecordingBackend::empty();

    list_values(&backend, "$entry_utm_source", Some("goo"), 7)
        .await
        .unwrap();

    let (sql, params) = backend.last_call();
    assert!(sql.contains("ILIKE {value:String}"));
    // the term travels only as a bound parameter, never in the SQL text
    assert!(!sql.contains("goo"));
    assert!(params.contains(&("value".to_string(), ParamValue::from("%goo%"))));
}

#[tokio::test]
async fn test_field_without_value_mapping_is_empty_not_error() {
    let backend = RecordingBackend::empty();

    // string field with no raw expression mapping
    let values = list_values(&backend, "$entry_pathname", None, 1).await.unwrap();
    assert!(values.is_empty());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_field_is_empty_not_error() {
    let backend = RecordingBackend::empty();

    let values = list_values(&backend, "$no_such_field", None, 1).await.unwrap();
    assert!(values.is_empty());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_non_string_non_boolean_field_is_empty() {
    let backend = RecordingBackend::empty();

    let values = list_values(&backend, "$session_duration", None, 1)
        .await
        .unwrap();
    assert!(values.is_empty());
    assert_eq!(backend.call_count(), 0);
}
