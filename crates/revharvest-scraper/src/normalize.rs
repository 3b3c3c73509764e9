//! Normalization from raw per-source records to [`revharvest_core::Review`].
//!
//! Each source has a key map naming where the common fields live in its raw
//! records. Fields that fail to coerce degrade to defaults; the only record
//! that is rejected is one with no review text.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use revharvest_core::{Review, ReviewTimestamp, Source};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid regex"));

/// Names of the common fields, which never appear in `Review::extra`.
const COMMON_FIELDS: &[&str] = &[
    "username",
    "review_content",
    "review_title",
    "rating",
    "datetime",
    "source",
    "company",
    "scraped_at",
];

/// Where each common field lives in a source's raw records.
#[derive(Debug, Clone, Copy)]
struct KeyMap {
    username: &'static str,
    content: &'static str,
    title: &'static str,
    rating: &'static str,
    datetime: &'static str,
}

fn key_map(source: Source) -> KeyMap {
    match source {
        Source::AppStore => KeyMap {
            username: "userName",
            content: "content",
            title: "title",
            rating: "score",
            datetime: "at",
        },
        Source::ReviewAggregator => KeyMap {
            username: "reviewer",
            content: "content",
            title: "title",
            rating: "rating",
            datetime: "date",
        },
        Source::Ecommerce => KeyMap {
            username: "username",
            content: "review_content",
            title: "review_title",
            rating: "rating",
            datetime: "datetime",
        },
    }
}

/// Normalizes a raw record, stamping it with the current time.
///
/// Returns `None` when the record has no non-blank review content.
#[must_use]
pub fn normalize(raw: &Map<String, Value>, source: Source, company: &str) -> Option<Review> {
    normalize_at(raw, source, company, Utc::now())
}

/// Normalizes a raw record with an explicit `scraped_at`. Deterministic.
#[must_use]
pub fn normalize_at(
    raw: &Map<String, Value>,
    source: Source,
    company: &str,
    scraped_at: DateTime<Utc>,
) -> Option<Review> {
    let keys = key_map(source);

    let review_content = raw.get(keys.content).and_then(text_of)?;
    if review_content.is_empty() {
        return None;
    }

    let username = raw
        .get(keys.username)
        .and_then(text_of)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| anonymous_username(&review_content));

    let review_title = raw.get(keys.title).and_then(text_of).unwrap_or_default();
    let rating = raw.get(keys.rating).and_then(coerce_rating);
    let datetime = raw
        .get(keys.datetime)
        .map(ReviewTimestamp::from_value)
        .unwrap_or_default();

    let mapped = [
        keys.username,
        keys.content,
        keys.title,
        keys.rating,
        keys.datetime,
    ];
    let extra: BTreeMap<String, Value> = raw
        .iter()
        .filter(|(k, _)| !mapped.contains(&k.as_str()) && !COMMON_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Some(Review {
        username,
        review_content,
        review_title,
        rating,
        datetime,
        source,
        company: company.to_string(),
        scraped_at,
        extra,
    })
}

/// Deterministic placeholder for reviews without an author.
#[must_use]
pub fn anonymous_username(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let hex: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
    format!("anonymous-{hex}")
}

/// Coerces a rating value to a number. Strings yield their first number
/// (`"4.5 out of 5"` -> 4.5); anything else is `None`.
#[must_use]
pub fn coerce_rating(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => NUMBER_RE
            .captures(s)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok()),
        _ => None,
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
