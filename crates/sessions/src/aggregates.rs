//! Aggregation expression builder
//!
//! Builds the mapping from logical field name to the expression that
//! reconstructs it from the physical table's partial aggregate states.
//! Entries are built in two passes: base aggregates first (one merge per
//! physical column), then derived fields that reference the base
//! expressions by name instead of re-deriving them, so each quantity has
//! exactly one canonical definition.

use crate::bounce::bounce_expr;
use crate::channel::{channel_type_expr, ChannelTypeExprs};
use crate::expr::{Expr, MergeKind, ScalarFunc};
use crate::modifiers::{BounceRatePageViewMode, QueryModifiers};

/// Name of the physical sessions table
pub const SESSIONS_TABLE: &str = "sessions";

/// Entry attribution fields reconstructed with an argMin merge, paired
/// with the physical column backing each
const ENTRY_ARG_MIN_FIELDS: &[(&str, &str)] = &[
    ("$entry_current_url", "entry_url"),
    ("$entry_utm_source", "initial_utm_source"),
    ("$entry_utm_campaign", "initial_utm_campaign"),
    ("$entry_utm_medium", "initial_utm_medium"),
    ("$entry_utm_term", "initial_utm_term"),
    ("$entry_utm_content", "initial_utm_content"),
    ("$entry_referring_domain", "initial_referring_domain"),
    ("$entry_gclid", "initial_gclid"),
    ("$entry_gad_source", "initial_gad_source"),
    ("$entry_gclsrc", "initial_gclsrc"),
    ("$entry_dclid", "initial_dclid"),
    ("$entry_gbraid", "initial_gbraid"),
    ("$entry_wbraid", "initial_wbraid"),
    ("$entry_fbclid", "initial_fbclid"),
    ("$entry_msclkid", "initial_msclkid"),
    ("$entry_twclid", "initial_twclid"),
    ("$entry_li_fat_id", "initial_li_fat_id"),
    ("$entry_mc_cid", "initial_mc_cid"),
    ("$entry_igshid", "initial_igshid"),
    ("$entry_ttclid", "initial_ttclid"),
];

/// Ordered mapping from logical field name to its aggregate expression
///
/// Vec-backed so iteration order is the build order, independent of any
/// hash state.
#[derive(Debug, Clone, Default)]
pub struct AggregateFields {
    entries: Vec<(String, Expr)>,
}

impl AggregateFields {
    fn insert(&mut self, name: &str, expr: Expr) {
        self.entries.push((name.to_string(), expr));
    }

    /// Expression for a logical field, if it has one
    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn expect(&self, name: &str) -> Expr {
        self.get(name)
            .unwrap_or_else(|| panic!("base aggregate {} must exist", name))
            .clone()
    }
}

/// Build the full logical-field expression mapping for one compilation
pub fn aggregate_fields(modifiers: &QueryModifiers) -> AggregateFields {
    derived_aggregates(base_aggregates(), modifiers)
}

/// argMin merge of an entry attribution column, with the ingestion
/// layer's literal "null" strings normalized away
fn arg_min_merge(column: &str) -> Expr {
    Expr::call(
        ScalarFunc::NullIf,
        vec![
            Expr::merge(MergeKind::ArgMinMerge, column),
            Expr::lit("null"),
        ],
    )
}

fn arg_max_merge(column: &str) -> Expr {
    Expr::call(
        ScalarFunc::NullIf,
        vec![
            Expr::merge(MergeKind::ArgMaxMerge, column),
            Expr::lit("null"),
        ],
    )
}

fn null_if_empty(expr: Expr) -> Expr {
    Expr::call(ScalarFunc::NullIf, vec![expr, Expr::lit("")])
}

/// Phase 1: one merge per physical column
fn base_aggregates() -> AggregateFields {
    let mut fields = AggregateFields::default();

    fields.insert("distinct_id", Expr::merge(MergeKind::AnyValue, "distinct_id"));
    fields.insert(
        "$start_timestamp",
        Expr::merge(MergeKind::Min, "min_timestamp"),
    );
    fields.insert("$end_timestamp", Expr::merge(MergeKind::Max, "max_timestamp"));
    fields.insert("$urls", Expr::merge(MergeKind::ArrayDistinctUnion, "urls"));

    for (name, column) in ENTRY_ARG_MIN_FIELDS {
        fields.insert(name, null_if_empty(arg_min_merge(column)));
    }
    fields.insert(
        "$exit_current_url",
        null_if_empty(arg_max_merge("exit_url")),
    );

    fields.insert(
        "$event_count_map",
        Expr::merge(MergeKind::SumMap, "event_count_map"),
    );
    fields.insert(
        "$pageview_count",
        Expr::merge(MergeKind::Sum, "pageview_count"),
    );
    fields.insert(
        "$autocapture_count",
        Expr::merge(MergeKind::Sum, "autocapture_count"),
    );

    fields
}

/// Phase 2: fields derived from the phase-1 expressions
fn derived_aggregates(mut fields: AggregateFields, modifiers: &QueryModifiers) -> AggregateFields {
    let entry_url = fields.expect("$entry_current_url");
    let exit_url = fields.expect("$exit_current_url");

    fields.insert(
        "$entry_pathname",
        Expr::call(ScalarFunc::Path, vec![entry_url.clone()]),
    );
    fields.insert(
        "$entry_hostname",
        Expr::call(ScalarFunc::Domain, vec![entry_url.clone()]),
    );
    fields.insert(
        "$exit_pathname",
        Expr::call(ScalarFunc::Path, vec![exit_url.clone()]),
    );
    fields.insert(
        "$exit_hostname",
        Expr::call(ScalarFunc::Domain, vec![exit_url]),
    );

    let duration = Expr::call(
        ScalarFunc::DateDiff,
        vec![
            Expr::lit("second"),
            fields.expect("$start_timestamp"),
            fields.expect("$end_timestamp"),
        ],
    );
    fields.insert("$session_duration", duration.clone());
    fields.insert("duration", duration.clone());

    fields.insert(
        "$num_uniq_urls",
        Expr::call(ScalarFunc::Length, vec![fields.expect("$urls")]),
    );

    let bounce_page_count = match modifiers.bounce_rate_page_view_mode() {
        BounceRatePageViewMode::UniqUrls => fields.expect("$num_uniq_urls"),
        BounceRatePageViewMode::CountPageviews => fields.expect("$pageview_count"),
    };
    fields.insert(
        "$is_bounce",
        bounce_expr(
            &bounce_page_count,
            &fields.expect("$autocapture_count"),
            &duration,
            modifiers.bounce_rate_duration_seconds(),
        ),
    );

    fields.insert(
        "$channel_type",
        channel_type_expr(
            modifiers.custom_channel_type_rules(),
            &ChannelTypeExprs {
                campaign: fields.expect("$entry_utm_campaign"),
                medium: fields.expect("$entry_utm_medium"),
                source: fields.expect("$entry_utm_source"),
                referring_domain: fields.expect("$entry_referring_domain"),
                url: fields.expect("$entry_current_url"),
                hostname: fields.expect("$entry_hostname"),
                pathname: fields.expect("$entry_pathname"),
                has_gclid: Expr::call(ScalarFunc::IsNotNull, vec![fields.expect("$entry_gclid")]),
                has_fbclid: Expr::call(
                    ScalarFunc::IsNotNull,
                    vec![fields.expect("$entry_fbclid")],
                ),
                gad_source: fields.expect("$entry_gad_source"),
            },
        ),
    );

    // aliases for callers reverting from the v2 schema
    fields.insert("$end_current_url", fields.expect("$exit_current_url"));
    fields.insert("$end_pathname", fields.expect("$exit_pathname"));

    fields
}
