//! Tests for the aggregation expression builder

use crate::aggregates::*;
use crate::expr::{Expr, MergeKind, ScalarFunc, Value};
use crate::modifiers::{BounceRatePageViewMode, QueryModifiers};

fn fields() -> AggregateFields {
    aggregate_fields(&QueryModifiers::default())
}

#[test]
fn test_identifier_uses_any_value() {
    assert_eq!(
        fields().get("distinct_id"),
        Some(&Expr::merge(MergeKind::AnyValue, "distinct_id"))
    );
}

#[test]
fn test_timestamps_use_min_max() {
    let f = fields();
    assert_eq!(
        f.get("$start_timestamp"),
        Some(&Expr::merge(MergeKind::Min, "min_timestamp"))
    );
    assert_eq!(
        f.get("$end_timestamp"),
        Some(&Expr::merge(MergeKind::Max, "max_timestamp"))
    );
}

#[test]
fn test_urls_use_distinct_union() {
    assert_eq!(
        fields().get("$urls"),
        Some(&Expr::merge(MergeKind::ArrayDistinctUnion, "urls"))
    );
}

#[test]
fn test_entry_url_is_null_normalized_arg_min() {
    // nullIf(nullIf(argMinMerge(entry_url), 'null'), '')
    let expected = Expr::call(
        ScalarFunc::NullIf,
        vec![
            Expr::call(
                ScalarFunc::NullIf,
                vec![
                    Expr::merge(MergeKind::ArgMinMerge, "entry_url"),
                    Expr::lit("null"),
                ],
            ),
            Expr::lit(""),
        ],
    );
    assert_eq!(fields().get("$entry_current_url"), Some(&expected));
}

#[test]
fn test_exit_url_is_arg_max() {
    let expected = Expr::call(
        ScalarFunc::NullIf,
        vec![
            Expr::call(
                ScalarFunc::NullIf,
                vec![
                    Expr::merge(MergeKind::ArgMaxMerge, "exit_url"),
                    Expr::lit("null"),
                ],
            ),
            Expr::lit(""),
        ],
    );
    assert_eq!(fields().get("$exit_current_url"), Some(&expected));
}

#[test]
fn test_every_entry_attribution_field_is_defined() {
    let f = fields();
    for name in [
        "$entry_utm_source",
        "$entry_utm_campaign",
        "$entry_utm_medium",
        "$entry_utm_term",
        "$entry_utm_content",
        "$entry_referring_domain",
        "$entry_gclid",
        "$entry_gad_source",
        "$entry_gclsrc",
        "$entry_dclid",
        "$entry_gbraid",
        "$entry_wbraid",
        "$entry_fbclid",
        "$entry_msclkid",
        "$entry_twclid",
        "$entry_li_fat_id",
        "$entry_mc_cid",
        "$entry_igshid",
        "$entry_ttclid",
    ] {
        let expr = f.get(name).unwrap_or_else(|| panic!("{} missing", name));
        // every entry field is argMin-merged and empty-string-normalized
        let Expr::Call(ScalarFunc::NullIf, args) = expr else {
            panic!("{} is not null-normalized: {:?}", name, expr);
        };
        assert_eq!(args[1], Expr::lit(""));
    }
}

#[test]
fn test_counts_use_sum() {
    let f = fields();
    assert_eq!(
        f.get("$pageview_count"),
        Some(&Expr::merge(MergeKind::Sum, "pageview_count"))
    );
    assert_eq!(
        f.get("$autocapture_count"),
        Some(&Expr::merge(MergeKind::Sum, "autocapture_count"))
    );
    assert_eq!(
        f.get("$event_count_map"),
        Some(&Expr::merge(MergeKind::SumMap, "event_count_map"))
    );
}

#[test]
fn test_pathname_derives_from_entry_url() {
    let f = fields();
    let entry_url = f.get("$entry_current_url").unwrap();
    assert_eq!(
        f.get("$entry_pathname"),
        Some(&Expr::call(ScalarFunc::Path, vec![entry_url.clone()]))
    );
    assert_eq!(
        f.get("$entry_hostname"),
        Some(&Expr::call(ScalarFunc::Domain, vec![entry_url.clone()]))
    );
}

#[test]
fn test_session_duration_is_date_diff_seconds() {
    let f = fields();
    let expected = Expr::call(
        ScalarFunc::DateDiff,
        vec![
            Expr::lit("second"),
            Expr::merge(MergeKind::Min, "min_timestamp"),
            Expr::merge(MergeKind::Max, "max_timestamp"),
        ],
    );
    assert_eq!(f.get("$session_duration"), Some(&expected));
}

#[test]
fn test_duration_aliases_session_duration() {
    let f = fields();
    assert_eq!(f.get("duration"), f.get("$session_duration"));
}

#[test]
fn test_v2_revert_aliases() {
    let f = fields();
    assert_eq!(f.get("$end_current_url"), f.get("$exit_current_url"));
    assert_eq!(f.get("$end_pathname"), f.get("$exit_pathname"));
}

#[test]
fn test_num_uniq_urls_is_array_length() {
    let f = fields();
    assert_eq!(
        f.get("$num_uniq_urls"),
        Some(&Expr::call(
            ScalarFunc::Length,
            vec![Expr::merge(MergeKind::ArrayDistinctUnion, "urls")]
        ))
    );
}

#[test]
fn test_bounce_uses_default_threshold() {
    let f = fields();
    let expr = f.get("$is_bounce").unwrap();

    // the default 10s threshold appears in the >= comparison
    fn find_literal(expr: &Expr, needle: &Value) -> bool {
        match expr {
            Expr::Literal(v) => v == needle,
            Expr::Call(_, args) => args.iter().any(|a| find_literal(a, needle)),
            _ => false,
        }
    }
    assert!(find_literal(expr, &Value::Int(10)));
}

#[test]
fn test_bounce_threshold_modifier() {
    let modifiers = QueryModifiers {
        bounce_rate_duration_seconds: Some(42),
        ..Default::default()
    };
    let f = aggregate_fields(&modifiers);
    let expr = f.get("$is_bounce").unwrap();

    let rendered = format!("{:?}", expr);
    assert!(rendered.contains("Int(42)"));
    assert!(!rendered.contains("Int(10)"));
}

#[test]
fn test_bounce_page_view_mode_selects_metric() {
    let default_fields = fields();
    let default_bounce = format!("{:?}", default_fields.get("$is_bounce").unwrap());
    assert!(default_bounce.contains("pageview_count"));

    let modifiers = QueryModifiers {
        bounce_rate_page_view_mode: Some(BounceRatePageViewMode::UniqUrls),
        ..Default::default()
    };
    let f = aggregate_fields(&modifiers);
    let uniq_bounce = format!("{:?}", f.get("$is_bounce").unwrap());
    // unique-URL mode feeds the array length instead of the raw counter
    assert!(uniq_bounce.contains("ArrayDistinctUnion"));
}

#[test]
fn test_channel_type_is_defined() {
    assert!(fields().contains("$channel_type"));
}

#[test]
fn test_base_fields_precede_derived_fields() {
    let f = fields();
    let order: Vec<&str> = f.iter().map(|(n, _)| n).collect();
    let pos = |name: &str| order.iter().position(|n| *n == name).unwrap();

    assert!(pos("$entry_current_url") < pos("$entry_pathname"));
    assert!(pos("$start_timestamp") < pos("$session_duration"));
    assert!(pos("$urls") < pos("$num_uniq_urls"));
    assert!(pos("$pageview_count") < pos("$is_bounce"));
}

#[test]
fn test_build_is_deterministic() {
    let a: Vec<String> = fields().iter().map(|(n, _)| n.to_string()).collect();
    let b: Vec<String> = fields().iter().map(|(n, _)| n.to_string()).collect();
    assert_eq!(a, b);
}
