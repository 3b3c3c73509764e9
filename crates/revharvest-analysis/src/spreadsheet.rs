//! CSV import of reviews collected elsewhere.
//!
//! Column headers are matched case-insensitively against a synonym list per
//! logical field; the first matching column in file order wins. Columns that
//! match no field are kept under a lower-snake-cased name.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use revharvest_core::ReviewTimestamp;
use serde::{Deserialize, Serialize};

use crate::error::ImportError;
use crate::types::ReviewText;

/// Logical fields and the column names accepted for each, in lookup order.
pub const COLUMN_SYNONYMS: &[(&str, &[&str])] = &[
    (
        "datetime",
        &[
            "datetime",
            "date",
            "timestamp",
            "created_at",
            "date_time",
            "submission_date",
            "created_date",
        ],
    ),
    (
        "review_datetime",
        &[
            "review_datetime",
            "review_date",
            "feedback_date",
            "review_timestamp",
            "review_time",
            "response_date",
            "feedback_datetime",
        ],
    ),
    (
        "username",
        &[
            "username",
            "user",
            "customer",
            "customer_name",
            "user_id",
            "customer_id",
            "respondent",
            "name",
            "reviewer",
        ],
    ),
    (
        "review_content",
        &[
            "review_content",
            "review",
            "feedback",
            "comment",
            "comments",
            "response",
            "content",
            "review_text",
            "feedback_text",
        ],
    ),
    (
        "review_title",
        &["review_title", "title", "subject", "heading", "summary"],
    ),
    (
        "rating",
        &[
            "rating",
            "score",
            "stars",
            "review_score",
            "satisfaction",
            "satisfaction_score",
            "review_rating",
        ],
    ),
];

const REQUIRED: &[&str] = &["datetime", "username", "review_content"];

/// One spreadsheet row mapped onto the logical review fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedReview {
    pub datetime: ReviewTimestamp,
    /// Falls back to `datetime` when the file has no review-date column.
    pub review_datetime: ReviewTimestamp,
    pub username: String,
    pub review_content: String,
    #[serde(default)]
    pub review_title: String,
    pub rating: Option<f64>,
    /// Unmapped columns keyed by their lower-snake-cased header.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ReviewText for ImportedReview {
    fn content(&self) -> &str {
        &self.review_content
    }

    fn title(&self) -> &str {
        &self.review_title
    }

    fn rating(&self) -> Option<f64> {
        self.rating
    }
}

/// Loads reviews from a CSV file.
///
/// # Errors
///
/// Returns [`ImportError::Io`] if the file cannot be opened, otherwise as
/// [`read_spreadsheet`].
pub fn load_spreadsheet(path: &Path) -> Result<Vec<ImportedReview>, ImportError> {
    let file = File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let reviews = read_spreadsheet(file)?;
    tracing::info!(path = %path.display(), rows = reviews.len(), "imported spreadsheet");
    Ok(reviews)
}

/// Reads reviews from CSV text with a header row.
///
/// # Errors
///
/// Returns [`ImportError::MissingColumns`] naming every required field with
/// no matching column and its accepted synonyms, or [`ImportError::Csv`] on
/// malformed CSV.
pub fn read_spreadsheet<R: Read>(reader: R) -> Result<Vec<ImportedReview>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let mapping = map_columns(&headers);

    let missing: Vec<String> = REQUIRED
        .iter()
        .filter(|field| !mapping.contains_key(**field))
        .map(|field| format!("'{field}' (possible columns: {})", synonyms(field).join(", ")))
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing.join(", ")));
    }

    let mapped: Vec<usize> = mapping.values().copied().collect();
    let unmapped: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| !mapped.contains(i))
        .map(|(i, h)| (i, snake_case(h)))
        .collect();

    let mut out = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let field = |name: &str| cell(&record, &mapping, name).to_string();

        let datetime = ReviewTimestamp::parse(&field("datetime"));
        let review_datetime = if mapping.contains_key("review_datetime") {
            ReviewTimestamp::parse(&field("review_datetime"))
        } else {
            datetime.clone()
        };

        let extra = unmapped
            .iter()
            .map(|(i, name)| (name.clone(), record.get(*i).unwrap_or_default().to_string()))
            .collect();

        out.push(ImportedReview {
            datetime,
            review_datetime,
            username: field("username"),
            review_content: field("review_content"),
            review_title: field("review_title"),
            rating: field("rating")
                .parse::<f64>()
                .ok()
                .filter(|r| r.is_finite()),
            extra,
        });
    }
    Ok(out)
}

fn cell<'a>(record: &'a StringRecord, mapping: &BTreeMap<&str, usize>, field: &str) -> &'a str {
    mapping
        .get(field)
        .and_then(|&i| record.get(i))
        .map_or("", str::trim)
}

/// Logical field to column index.
fn map_columns(headers: &[String]) -> BTreeMap<&'static str, usize> {
    let mut mapping = BTreeMap::new();
    for (field, names) in COLUMN_SYNONYMS {
        let found = headers.iter().position(|h| {
            let lower = h.trim().to_lowercase();
            names.iter().any(|n| *n == lower)
        });
        if let Some(i) = found {
            mapping.insert(*field, i);
        }
    }
    mapping
}

fn synonyms(field: &str) -> &'static [&'static str] {
    COLUMN_SYNONYMS
        .iter()
        .find(|(f, _)| *f == field)
        .map(|&(_, names)| names)
        .unwrap_or_default()
}

fn snake_case(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
#[path = "spreadsheet_test.rs"]
mod tests;
