use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of upstream a review was harvested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    AppStore,
    ReviewAggregator,
    Ecommerce,
}

impl Source {
    /// Human-readable name used in `SourceResult::source_name`.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Source::AppStore => "Google Play Store",
            Source::ReviewAggregator => "Trustpilot",
            Source::Ecommerce => "E-commerce",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::AppStore => write!(f, "app_store"),
            Source::ReviewAggregator => write!(f, "review_aggregator"),
            Source::Ecommerce => write!(f, "ecommerce"),
        }
    }
}

/// A review timestamp. Values that parse are stored as UTC; anything else is
/// kept verbatim so no upstream information is lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReviewTimestamp {
    Parsed(DateTime<Utc>),
    Raw(String),
}

impl ReviewTimestamp {
    /// Parse a free-form timestamp string.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` and integer epoch
    /// seconds. Everything else (including the empty string) falls back to
    /// [`ReviewTimestamp::Raw`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ReviewTimestamp::Raw(String::new());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return ReviewTimestamp::Parsed(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
            return ReviewTimestamp::Parsed(Utc.from_utc_datetime(&naive));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
            return ReviewTimestamp::Parsed(Utc.from_utc_datetime(&naive));
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return ReviewTimestamp::Parsed(Utc.from_utc_datetime(&naive));
            }
        }
        if let Ok(secs) = trimmed.parse::<i64>() {
            if let Some(dt) = DateTime::from_timestamp(secs, 0) {
                return ReviewTimestamp::Parsed(dt);
            }
        }

        ReviewTimestamp::Raw(trimmed.to_string())
    }

    /// Interpret a JSON value as a timestamp. Numbers are epoch seconds.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => n
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map_or_else(
                    || ReviewTimestamp::Raw(n.to_string()),
                    ReviewTimestamp::Parsed,
                ),
            Value::Null => ReviewTimestamp::Raw(String::new()),
            other => ReviewTimestamp::Raw(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            ReviewTimestamp::Parsed(dt) => Some(*dt),
            ReviewTimestamp::Raw(_) => None,
        }
    }
}

impl Default for ReviewTimestamp {
    fn default() -> Self {
        ReviewTimestamp::Raw(String::new())
    }
}

/// A single normalized customer review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub username: String,
    pub review_content: String,
    #[serde(default)]
    pub review_title: String,
    pub rating: Option<f64>,
    #[serde(default)]
    pub datetime: ReviewTimestamp,
    pub source: Source,
    pub company: String,
    pub scraped_at: DateTime<Utc>,
    /// Source-specific fields with no slot in the common schema.
    #[serde(default, flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Product discovered by the e-commerce adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMeta {
    pub company: String,
    pub search_term: String,
    pub product_name: String,
    pub product_url: String,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub reviews_count: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Success,
    Error,
}

/// Outcome of one (entity, source) harvest attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    pub source_name: String,
    pub company: String,
    pub count: usize,
    pub status: SourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<usize>,
}

impl SourceResult {
    #[must_use]
    pub fn success(source: Source, company: &str, count: usize) -> Self {
        Self {
            source_name: source.display_name().to_string(),
            company: company.to_string(),
            count,
            status: SourceStatus::Success,
            error: None,
            products: None,
        }
    }

    #[must_use]
    pub fn failure(source: Source, company: &str, count: usize, error: impl Into<String>) -> Self {
        Self {
            source_name: source.display_name().to_string(),
            company: company.to_string(),
            count,
            status: SourceStatus::Error,
            error: Some(error.into()),
            products: None,
        }
    }

    #[must_use]
    pub fn with_products(mut self, products: usize) -> Self {
        self.products = Some(products);
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SourceStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rfc3339() {
        let ts = ReviewTimestamp::parse("2024-03-01T10:15:00Z");
        let dt = ts.as_datetime().unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T10:15:00+00:00");
    }

    #[test]
    fn parse_space_separated_datetime() {
        let ts = ReviewTimestamp::parse("2024-03-01 10:15:00");
        assert!(ts.as_datetime().is_some());
    }

    #[test]
    fn parse_date_only() {
        let ts = ReviewTimestamp::parse("2024-03-01");
        assert_eq!(
            ts.as_datetime().unwrap().to_rfc3339(),
            "2024-03-01T00:00:00+00:00"
        );
    }

    #[test]
    fn parse_epoch_seconds() {
        let ts = ReviewTimestamp::parse("1700000000");
        assert_eq!(ts.as_datetime().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn unparseable_text_is_kept_raw() {
        let ts = ReviewTimestamp::parse("  3 days ago ");
        assert_eq!(ts, ReviewTimestamp::Raw("3 days ago".to_string()));
    }

    #[test]
    fn null_value_becomes_empty_raw() {
        assert_eq!(
            ReviewTimestamp::from_value(&Value::Null),
            ReviewTimestamp::Raw(String::new())
        );
    }

    #[test]
    fn source_result_serializes_lowercase_status() {
        let result = SourceResult::failure(Source::ReviewAggregator, "Acme", 0, "boom");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["source_name"], "Trustpilot");
        assert_eq!(json["error"], "boom");
        assert!(json.get("products").is_none());
    }

    #[test]
    fn review_extra_fields_are_flattened() {
        let mut extra = BTreeMap::new();
        extra.insert("verified".to_string(), Value::Bool(true));
        let review = Review {
            username: "ana".to_string(),
            review_content: "great".to_string(),
            review_title: String::new(),
            rating: Some(5.0),
            datetime: ReviewTimestamp::parse("2024-01-01"),
            source: Source::ReviewAggregator,
            company: "Acme".to_string(),
            scraped_at: DateTime::from_timestamp(0, 0).unwrap(),
            extra,
        };
        let json = serde_json::to_value(&review).unwrap();
        assert_eq!(json["verified"], true);
        assert_eq!(json["source"], "review_aggregator");
    }
}
