//! Marketing channel classification
//!
//! Maps a session's entry attribution signals (UTM triple, referring
//! domain, click ids) to a channel label. Caller-supplied custom rules are
//! evaluated first, in their given order, and short-circuit the built-in
//! chain; built-in rules fall back in a fixed priority order ending in a
//! catch-all. Both the runtime classifier and the expression compiler walk
//! the same ordered chain, so rule tables are ordered slices throughout -
//! never hash maps.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::expr::{Expr, ScalarFunc};

/// Built-in channel labels, in catalog order
pub const CHANNEL_TYPES: &[&str] = &[
    "Direct",
    "Organic Search",
    "Paid Search",
    "Paid Social",
    "Organic Social",
    "Email",
    "Affiliate",
    "Referral",
    "Other",
];

/// A built-in channel label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Direct,
    OrganicSearch,
    PaidSearch,
    PaidSocial,
    OrganicSocial,
    Email,
    Affiliate,
    Referral,
    Other,
}

impl ChannelType {
    pub fn label(self) -> &'static str {
        match self {
            ChannelType::Direct => "Direct",
            ChannelType::OrganicSearch => "Organic Search",
            ChannelType::PaidSearch => "Paid Search",
            ChannelType::PaidSocial => "Paid Social",
            ChannelType::OrganicSocial => "Organic Social",
            ChannelType::Email => "Email",
            ChannelType::Affiliate => "Affiliate",
            ChannelType::Referral => "Referral",
            ChannelType::Other => "Other",
        }
    }
}

// =============================================================================
// Built-in signal tables
// =============================================================================

const PAID_MEDIUM_PATTERN: &str = r"^(.*cp.*|ppc|retargeting|paid.*)$";

static PAID_MEDIUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(PAID_MEDIUM_PATTERN).expect("paid medium pattern is valid"));

const SEARCH_SOURCES: &[&str] = &[
    "google",
    "bing",
    "yahoo",
    "duckduckgo",
    "baidu",
    "yandex",
    "ecosia",
    "ask",
];

const SEARCH_DOMAINS: &[&str] = &[
    "google.",
    "bing.",
    "search.yahoo",
    "duckduckgo.",
    "yandex.",
    "baidu.",
    "ecosia.",
];

const SOCIAL_SOURCES: &[&str] = &[
    "facebook",
    "fb",
    "instagram",
    "ig",
    "twitter",
    "x",
    "linkedin",
    "pinterest",
    "tiktok",
    "reddit",
    "snapchat",
    "threads",
];

const SOCIAL_DOMAINS: &[&str] = &[
    "facebook.",
    "instagram.",
    "twitter.",
    "t.co",
    "linkedin.",
    "lnkd.in",
    "pinterest.",
    "tiktok.",
    "reddit.",
    "snapchat.",
];

const EMAIL_MEDIUMS: &[&str] = &["email", "e-mail", "e_mail", "e mail", "newsletter"];

const EMAIL_SOURCES: &[&str] = &["email", "e-mail", "e_mail", "e mail"];

const AFFILIATE_MEDIUMS: &[&str] = &["affiliate"];

/// Sentinel written by the ingestion layer when a session had no referrer
const DIRECT_REFERRER: &str = "$direct";

const DIRECT_SOURCES: &[&str] = &["direct", "(direct)", "(none)", "(not set)"];

// =============================================================================
// Custom rules
// =============================================================================

/// How a rule's conditions combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCombiner {
    #[default]
    And,
    Or,
}

/// Attribution signal a custom rule condition inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRuleKey {
    UtmSource,
    UtmMedium,
    UtmCampaign,
    ReferringDomain,
    Url,
    Hostname,
    Pathname,
}

/// Comparison applied by a custom rule condition
///
/// Negated operators do not match absent values, mirroring SQL NULL
/// comparison semantics so the runtime and compiled forms agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRuleOp {
    Exact,
    IsNot,
    IsSet,
    IsNotSet,
    Icontains,
    NotIcontains,
    Regex,
    NotRegex,
}

/// One condition of a custom channel rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomChannelCondition {
    pub key: ChannelRuleKey,
    pub op: ChannelRuleOp,
    #[serde(default)]
    pub value: Vec<String>,
}

/// A caller-defined channel rule
///
/// Rules are evaluated in caller order; the first match wins and
/// short-circuits the built-in chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomChannelRule {
    pub channel_type: String,
    #[serde(default)]
    pub combiner: RuleCombiner,
    pub items: Vec<CustomChannelCondition>,
}

// =============================================================================
// Runtime classification
// =============================================================================

/// Attribution signals of a single session, as finalized scalars
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelInputs<'a> {
    pub campaign: Option<&'a str>,
    pub medium: Option<&'a str>,
    pub source: Option<&'a str>,
    pub referring_domain: Option<&'a str>,
    pub url: Option<&'a str>,
    pub hostname: Option<&'a str>,
    pub pathname: Option<&'a str>,
    pub has_gclid: bool,
    pub has_fbclid: bool,
    pub gad_source: Option<&'a str>,
}

/// Classify a session's channel
///
/// Total: always returns a label. Identical inputs always yield the
/// identical label.
pub fn classify(inputs: &ChannelInputs<'_>, custom_rules: &[CustomChannelRule]) -> String {
    for rule in custom_rules {
        if rule_matches(rule, inputs) {
            return rule.channel_type.clone();
        }
    }
    builtin_classify(inputs).label().to_string()
}

/// Empty strings are treated as absent; the aggregate layer
/// null-normalizes them the same way.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn in_table(value: Option<&str>, table: &[&str]) -> bool {
    match value {
        Some(v) => {
            let v = v.to_lowercase();
            table.contains(&v.as_str())
        }
        None => false,
    }
}

fn domain_in_table(domain: Option<&str>, table: &[&str]) -> bool {
    match domain {
        Some(d) if d != DIRECT_REFERRER => {
            let d = d.to_lowercase();
            table.iter().any(|needle| d.contains(needle))
        }
        _ => false,
    }
}

fn builtin_classify(inputs: &ChannelInputs<'_>) -> ChannelType {
    let medium = non_empty(inputs.medium);
    let source = non_empty(inputs.source);
    let referring = non_empty(inputs.referring_domain);
    let gad_source = non_empty(inputs.gad_source);

    let paid_medium = medium.is_some_and(|m| PAID_MEDIUM_RE.is_match(&m.to_lowercase()));
    let from_search =
        in_table(source, SEARCH_SOURCES) || domain_in_table(referring, SEARCH_DOMAINS);
    let from_social =
        in_table(source, SOCIAL_SOURCES) || domain_in_table(referring, SOCIAL_DOMAINS);

    if inputs.has_gclid || gad_source == Some("1") || (paid_medium && from_search) {
        return ChannelType::PaidSearch;
    }
    if inputs.has_fbclid || (paid_medium && from_social) {
        return ChannelType::PaidSocial;
    }
    if paid_medium {
        // paid traffic with no recognizable network
        return ChannelType::Other;
    }
    if in_table(medium, EMAIL_MEDIUMS) || in_table(source, EMAIL_SOURCES) {
        return ChannelType::Email;
    }
    if in_table(medium, AFFILIATE_MEDIUMS) {
        return ChannelType::Affiliate;
    }
    if from_search {
        return ChannelType::OrganicSearch;
    }
    if from_social {
        return ChannelType::OrganicSocial;
    }
    if referring == Some(DIRECT_REFERRER)
        && medium.is_none()
        && source.is_none_or(|s| DIRECT_SOURCES.contains(&s.to_lowercase().as_str()))
    {
        return ChannelType::Direct;
    }
    if referring.is_some_and(|r| r != DIRECT_REFERRER) {
        return ChannelType::Referral;
    }
    ChannelType::Other
}

fn rule_matches(rule: &CustomChannelRule, inputs: &ChannelInputs<'_>) -> bool {
    if rule.items.is_empty() {
        return false;
    }
    match rule.combiner {
        RuleCombiner::And => rule.items.iter().all(|c| condition_matches(c, inputs)),
        RuleCombiner::Or => rule.items.iter().any(|c| condition_matches(c, inputs)),
    }
}

fn key_value<'a>(inputs: &ChannelInputs<'a>, key: ChannelRuleKey) -> Option<&'a str> {
    let value = match key {
        ChannelRuleKey::UtmSource => inputs.source,
        ChannelRuleKey::UtmMedium => inputs.medium,
        ChannelRuleKey::UtmCampaign => inputs.campaign,
        ChannelRuleKey::ReferringDomain => inputs.referring_domain,
        ChannelRuleKey::Url => inputs.url,
        ChannelRuleKey::Hostname => inputs.hostname,
        ChannelRuleKey::Pathname => inputs.pathname,
    };
    non_empty(value)
}

fn condition_matches(cond: &CustomChannelCondition, inputs: &ChannelInputs<'_>) -> bool {
    // comparison operators need at least one value to compare against
    if cond.value.is_empty()
        && !matches!(cond.op, ChannelRuleOp::IsSet | ChannelRuleOp::IsNotSet)
    {
        return false;
    }
    let value = key_value(inputs, cond.key);
    match cond.op {
        ChannelRuleOp::Exact => value.is_some_and(|v| cond.value.iter().any(|c| c == v)),
        ChannelRuleOp::IsNot => value.is_some_and(|v| !cond.value.iter().any(|c| c == v)),
        ChannelRuleOp::IsSet => value.is_some(),
        ChannelRuleOp::IsNotSet => value.is_none(),
        ChannelRuleOp::Icontains => value.is_some_and(|v| {
            let v = v.to_lowercase();
            cond.value.iter().any(|c| v.contains(&c.to_lowercase()))
        }),
        ChannelRuleOp::NotIcontains => value.is_some_and(|v| {
            let v = v.to_lowercase();
            !cond.value.iter().any(|c| v.contains(&c.to_lowercase()))
        }),
        ChannelRuleOp::Regex => value.is_some_and(|v| {
            cond.value
                .iter()
                .any(|c| Regex::new(c).map(|re| re.is_match(v)).unwrap_or(false))
        }),
        ChannelRuleOp::NotRegex => value.is_some_and(|v| {
            !cond.value
                .iter()
                .any(|c| Regex::new(c).map(|re| re.is_match(v)).unwrap_or(false))
        }),
    }
}

// =============================================================================
// Expression compilation
// =============================================================================

/// Attribution signals as expressions over the merged aggregates
#[derive(Debug, Clone)]
pub struct ChannelTypeExprs {
    pub campaign: Expr,
    pub medium: Expr,
    pub source: Expr,
    pub referring_domain: Expr,
    pub url: Expr,
    pub hostname: Expr,
    pub pathname: Expr,
    pub has_gclid: Expr,
    pub has_fbclid: Expr,
    pub gad_source: Expr,
}

/// Compile the classification chain into a conditional expression
///
/// Mirrors [`classify`]: custom rules first (earliest rule outermost),
/// then the built-in chain, ending in the catch-all label.
pub fn channel_type_expr(custom_rules: &[CustomChannelRule], exprs: &ChannelTypeExprs) -> Expr {
    let mut expr = builtin_channel_expr(exprs);
    for rule in custom_rules.iter().rev() {
        expr = Expr::call(
            ScalarFunc::If,
            vec![
                rule_condition_expr(rule, exprs),
                Expr::lit(rule.channel_type.as_str()),
                expr,
            ],
        );
    }
    expr
}

fn lower(e: &Expr) -> Expr {
    Expr::call(ScalarFunc::Lower, vec![e.clone()])
}

fn in_any(e: Expr, table: &[&str]) -> Expr {
    let mut args = Vec::with_capacity(table.len() + 1);
    args.push(e);
    args.extend(table.iter().map(|v| Expr::lit(*v)));
    Expr::call(ScalarFunc::In, args)
}

fn contains_any(e: &Expr, needles: &[&str]) -> Expr {
    let likes = needles
        .iter()
        .map(|n| {
            Expr::call(
                ScalarFunc::Like,
                vec![lower(e), Expr::lit(format!("%{}%", n))],
            )
        })
        .collect();
    Expr::call(ScalarFunc::Or, likes)
}

fn eq_str(e: &Expr, v: &str) -> Expr {
    Expr::call(ScalarFunc::Equals, vec![e.clone(), Expr::lit(v)])
}

fn builtin_channel_expr(x: &ChannelTypeExprs) -> Expr {
    let paid_medium = Expr::call(
        ScalarFunc::Match,
        vec![lower(&x.medium), Expr::lit(PAID_MEDIUM_PATTERN)],
    );
    let from_search = Expr::call(
        ScalarFunc::Or,
        vec![
            in_any(lower(&x.source), SEARCH_SOURCES),
            contains_any(&x.referring_domain, SEARCH_DOMAINS),
        ],
    );
    let from_social = Expr::call(
        ScalarFunc::Or,
        vec![
            in_any(lower(&x.source), SOCIAL_SOURCES),
            contains_any(&x.referring_domain, SOCIAL_DOMAINS),
        ],
    );

    let paid_search = Expr::call(
        ScalarFunc::Or,
        vec![
            x.has_gclid.clone(),
            eq_str(&x.gad_source, "1"),
            Expr::call(
                ScalarFunc::And,
                vec![paid_medium.clone(), from_search.clone()],
            ),
        ],
    );
    let paid_social = Expr::call(
        ScalarFunc::Or,
        vec![
            x.has_fbclid.clone(),
            Expr::call(
                ScalarFunc::And,
                vec![paid_medium.clone(), from_social.clone()],
            ),
        ],
    );
    let email = Expr::call(
        ScalarFunc::Or,
        vec![
            in_any(lower(&x.medium), EMAIL_MEDIUMS),
            in_any(lower(&x.source), EMAIL_SOURCES),
        ],
    );
    let affiliate = in_any(lower(&x.medium), AFFILIATE_MEDIUMS);
    let direct = Expr::call(
        ScalarFunc::And,
        vec![
            eq_str(&x.referring_domain, DIRECT_REFERRER),
            Expr::call(ScalarFunc::IsNull, vec![x.medium.clone()]),
            Expr::call(
                ScalarFunc::Or,
                vec![
                    Expr::call(ScalarFunc::IsNull, vec![x.source.clone()]),
                    in_any(lower(&x.source), DIRECT_SOURCES),
                ],
            ),
        ],
    );
    let referral = Expr::call(
        ScalarFunc::And,
        vec![
            Expr::call(ScalarFunc::IsNotNull, vec![x.referring_domain.clone()]),
            Expr::call(
                ScalarFunc::NotEquals,
                vec![x.referring_domain.clone(), Expr::lit(DIRECT_REFERRER)],
            ),
        ],
    );

    // chain order matches builtin_classify exactly
    let chain: Vec<(Expr, &str)> = vec![
        (paid_search, ChannelType::PaidSearch.label()),
        (paid_social, ChannelType::PaidSocial.label()),
        (paid_medium, ChannelType::Other.label()),
        (email, ChannelType::Email.label()),
        (affiliate, ChannelType::Affiliate.label()),
        (from_search, ChannelType::OrganicSearch.label()),
        (from_social, ChannelType::OrganicSocial.label()),
        (direct, ChannelType::Direct.label()),
        (referral, ChannelType::Referral.label()),
    ];

    let mut expr = Expr::lit(ChannelType::Other.label());
    for (cond, label) in chain.into_iter().rev() {
        expr = Expr::call(ScalarFunc::If, vec![cond, Expr::lit(label), expr]);
    }
    expr
}

fn rule_key_expr<'a>(x: &'a ChannelTypeExprs, key: ChannelRuleKey) -> &'a Expr {
    match key {
        ChannelRuleKey::UtmSource => &x.source,
        ChannelRuleKey::UtmMedium => &x.medium,
        ChannelRuleKey::UtmCampaign => &x.campaign,
        ChannelRuleKey::ReferringDomain => &x.referring_domain,
        ChannelRuleKey::Url => &x.url,
        ChannelRuleKey::Hostname => &x.hostname,
        ChannelRuleKey::Pathname => &x.pathname,
    }
}

fn rule_condition_expr(rule: &CustomChannelRule, x: &ChannelTypeExprs) -> Expr {
    if rule.items.is_empty() {
        return Expr::lit(false);
    }
    let mut conditions: Vec<Expr> = rule
        .items
        .iter()
        .map(|c| condition_expr(c, x))
        .collect();
    if conditions.len() == 1 {
        return conditions.remove(0);
    }
    match rule.combiner {
        RuleCombiner::And => Expr::call(ScalarFunc::And, conditions),
        RuleCombiner::Or => Expr::call(ScalarFunc::Or, conditions),
    }
}

fn condition_expr(cond: &CustomChannelCondition, x: &ChannelTypeExprs) -> Expr {
    // mirror the runtime guard: value-comparing operators with nothing to
    // compare against never match
    if cond.value.is_empty()
        && !matches!(cond.op, ChannelRuleOp::IsSet | ChannelRuleOp::IsNotSet)
    {
        return Expr::lit(false);
    }
    let field = rule_key_expr(x, cond.key);
    let values: Vec<&str> = cond.value.iter().map(String::as_str).collect();
    match cond.op {
        ChannelRuleOp::Exact => match values.as_slice() {
            [single] => eq_str(field, single),
            _ => in_any(field.clone(), &values),
        },
        ChannelRuleOp::IsNot => match values.as_slice() {
            [single] => Expr::call(
                ScalarFunc::NotEquals,
                vec![field.clone(), Expr::lit(*single)],
            ),
            _ => {
                let mut args = Vec::with_capacity(values.len() + 1);
                args.push(field.clone());
                args.extend(values.iter().map(|v| Expr::lit(*v)));
                Expr::call(ScalarFunc::NotIn, args)
            }
        },
        ChannelRuleOp::IsSet => Expr::call(ScalarFunc::IsNotNull, vec![field.clone()]),
        ChannelRuleOp::IsNotSet => Expr::call(ScalarFunc::IsNull, vec![field.clone()]),
        ChannelRuleOp::Icontains => any_of(
            values
                .iter()
                .map(|v| {
                    Expr::call(
                        ScalarFunc::Like,
                        vec![lower(field), Expr::lit(format!("%{}%", v.to_lowercase()))],
                    )
                })
                .collect(),
        ),
        ChannelRuleOp::NotIcontains => Expr::call(
            ScalarFunc::Not,
            vec![any_of(
                values
                    .iter()
                    .map(|v| {
                        Expr::call(
                            ScalarFunc::Like,
                            vec![lower(field), Expr::lit(format!("%{}%", v.to_lowercase()))],
                        )
                    })
                    .collect(),
            )],
        ),
        ChannelRuleOp::Regex => any_of(
            values
                .iter()
                .map(|v| Expr::call(ScalarFunc::Match, vec![field.clone(), Expr::lit(*v)]))
                .collect(),
        ),
        ChannelRuleOp::NotRegex => Expr::call(
            ScalarFunc::Not,
            vec![any_of(
                values
                    .iter()
                    .map(|v| Expr::call(ScalarFunc::Match, vec![field.clone(), Expr::lit(*v)]))
                    .collect(),
            )],
        ),
    }
}

fn any_of(mut conditions: Vec<Expr>) -> Expr {
    match conditions.len() {
        0 => Expr::lit(false),
        1 => conditions.remove(0),
        _ => Expr::call(ScalarFunc::Or, conditions),
    }
}
