//! Caller-supplied query modifiers
//!
//! Every modifier is optional; absent or null values fall back to
//! documented defaults rather than failing.

use serde::{Deserialize, Serialize};

use crate::channel::CustomChannelRule;

/// Bounce duration threshold applied when the caller supplies none
pub const DEFAULT_BOUNCE_RATE_DURATION_SECONDS: i64 = 10;

/// Which page-count metric feeds the bounce classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BounceRatePageViewMode {
    /// Raw pageview count
    #[default]
    CountPageviews,
    /// Number of distinct URLs seen in the session
    UniqUrls,
}

/// Modifiers bundle attached to a compilation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryModifiers {
    pub bounce_rate_duration_seconds: Option<i64>,
    pub bounce_rate_page_view_mode: Option<BounceRatePageViewMode>,
    pub custom_channel_type_rules: Option<Vec<CustomChannelRule>>,
}

impl QueryModifiers {
    /// Effective bounce duration threshold in seconds
    pub fn bounce_rate_duration_seconds(&self) -> i64 {
        self.bounce_rate_duration_seconds
            .unwrap_or(DEFAULT_BOUNCE_RATE_DURATION_SECONDS)
    }

    /// Effective page-count metric selection
    pub fn bounce_rate_page_view_mode(&self) -> BounceRatePageViewMode {
        self.bounce_rate_page_view_mode.unwrap_or_default()
    }

    /// Custom channel rules, earliest first (empty when none supplied)
    pub fn custom_channel_type_rules(&self) -> &[CustomChannelRule] {
        self.custom_channel_type_rules.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let modifiers = QueryModifiers::default();
        assert_eq!(
            modifiers.bounce_rate_duration_seconds(),
            DEFAULT_BOUNCE_RATE_DURATION_SECONDS
        );
        assert_eq!(
            modifiers.bounce_rate_page_view_mode(),
            BounceRatePageViewMode::CountPageviews
        );
        assert!(modifiers.custom_channel_type_rules().is_empty());
    }

    #[test]
    fn test_explicit_values_win() {
        let modifiers = QueryModifiers {
            bounce_rate_duration_seconds: Some(30),
            bounce_rate_page_view_mode: Some(BounceRatePageViewMode::UniqUrls),
            custom_channel_type_rules: None,
        };
        assert_eq!(modifiers.bounce_rate_duration_seconds(), 30);
        assert_eq!(
            modifiers.bounce_rate_page_view_mode(),
            BounceRatePageViewMode::UniqUrls
        );
    }

    #[test]
    fn test_deserialize_partial_json() {
        let modifiers: QueryModifiers =
            serde_json::from_str(r#"{"bounce_rate_duration_seconds": 5}"#).unwrap();
        assert_eq!(modifiers.bounce_rate_duration_seconds(), 5);
        assert_eq!(
            modifiers.bounce_rate_page_view_mode(),
            BounceRatePageViewMode::CountPageviews
        );
    }

    #[test]
    fn test_deserialize_page_view_mode() {
        let modifiers: QueryModifiers =
            serde_json::from_str(r#"{"bounce_rate_page_view_mode": "uniq_urls"}"#).unwrap();
        assert_eq!(
            modifiers.bounce_rate_page_view_mode(),
            BounceRatePageViewMode::UniqUrls
        );
    }
}
