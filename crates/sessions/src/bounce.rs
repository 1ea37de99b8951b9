//! Bounce classification
//!
//! A bounce is a single-pageview, low-engagement, short session. The flag
//! is tri-state: a session with zero pageviews is Unknown, not NotBounce,
//! so that zero-activity sessions never enter the bounce-rate denominator.

use crate::expr::{Expr, ScalarFunc};

/// Tri-state bounce flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BounceFlag {
    Bounce,
    NotBounce,
    /// Zero-activity session; propagates as a missing value
    Unknown,
}

/// Classify a session from its finalized counters
///
/// `page_count` is whichever page metric the caller selected (raw
/// pageviews or distinct URLs); the same metric must feed both the
/// zero-check and the `> 1` check, which this signature enforces.
pub fn classify(
    page_count: i64,
    autocapture_count: i64,
    duration_seconds: i64,
    threshold_seconds: i64,
) -> BounceFlag {
    if page_count == 0 {
        return BounceFlag::Unknown;
    }
    if page_count > 1 || autocapture_count > 0 || duration_seconds >= threshold_seconds {
        return BounceFlag::NotBounce;
    }
    BounceFlag::Bounce
}

/// The same policy as an expression over merged aggregates
///
/// `page_count` is the already-selected page metric expression; it appears
/// in both the zero-check and the `> 1` check.
pub fn bounce_expr(
    page_count: &Expr,
    autocapture_count: &Expr,
    duration: &Expr,
    threshold_seconds: i64,
) -> Expr {
    Expr::call(
        ScalarFunc::If,
        vec![
            // a session with no pageviews contributes to neither side of
            // the bounce rate
            Expr::call(
                ScalarFunc::Equals,
                vec![page_count.clone(), Expr::lit(0i64)],
            ),
            Expr::null(),
            Expr::call(
                ScalarFunc::Not,
                vec![Expr::call(
                    ScalarFunc::Or,
                    vec![
                        // more than one pageview: not a bounce
                        Expr::call(
                            ScalarFunc::Greater,
                            vec![page_count.clone(), Expr::lit(1i64)],
                        ),
                        // any autocapture interaction: not a bounce
                        Expr::call(
                            ScalarFunc::Greater,
                            vec![autocapture_count.clone(), Expr::lit(0i64)],
                        ),
                        // stayed past the threshold: not a bounce
                        Expr::call(
                            ScalarFunc::GreaterOrEquals,
                            vec![duration.clone(), Expr::lit(threshold_seconds)],
                        ),
                    ],
                )],
            ),
        ],
    )
}
