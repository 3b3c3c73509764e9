//! Client for the Google Play review RPC (`batchexecute`, rpc id `UsvDTd`).
//!
//! The endpoint answers with an anti-XSSI prefix (`)]}'`) followed by a JSON
//! envelope whose payload is itself a JSON-encoded string. Parsing is
//! defensive: missing or oddly-shaped fields are skipped rather than treated
//! as errors, since the layout is undocumented.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Client;
use serde_json::{json, Map, Value};

use crate::error::ScraperError;
use crate::rate_limit::RateController;
use crate::retry::{retry_with_backoff, RetryPolicy};

const DEFAULT_BASE_URL: &str = "https://play.google.com";
const RPC_ID: &str = "UsvDTd";

/// Positions of named fields inside one review array.
const REVIEW_FIELDS: &[(&str, &[usize])] = &[
    ("userName", &[1, 0]),
    ("userImage", &[1, 1, 3, 2]),
    ("content", &[4]),
    ("score", &[2]),
    ("thumbsUpCount", &[6]),
    ("reviewCreatedVersion", &[10]),
    ("at", &[5, 0]),
    ("replyContent", &[7, 1]),
    ("repliedAt", &[7, 2, 0]),
    ("appVersion", &[10]),
];

/// One page of reviews plus the token for the next page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPage {
    pub reviews: Vec<Map<String, Value>>,
    pub next_token: Option<String>,
}

/// Parameters for one review page request.
#[derive(Debug, Clone, Copy)]
pub struct ReviewQuery<'a> {
    pub app_id: &'a str,
    pub language: &'a str,
    pub country: &'a str,
    pub sort: u8,
    pub count: usize,
    pub token: Option<&'a str>,
}

pub struct PlayStoreClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl PlayStoreClient {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, retry: RetryPolicy) -> Result<Self, ScraperError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout_secs, retry)
    }

    /// Points the client at a different host. Used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// Fetches one page of reviews. Each attempt waits on `rate` first.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`] / [`ScraperError::UnexpectedStatus`] /
    ///   [`ScraperError::Http`] after retries are exhausted.
    /// - [`ScraperError::Envelope`] / [`ScraperError::Deserialize`] when the
    ///   body cannot be interpreted at all.
    pub async fn fetch_reviews(
        &self,
        query: ReviewQuery<'_>,
        rate: &RateController,
    ) -> Result<ReviewPage, ScraperError> {
        let url = format!(
            "{}/_/PlayStoreUi/data/batchexecute?hl={}&gl={}",
            self.base_url,
            utf8_percent_encode(query.language, NON_ALPHANUMERIC),
            utf8_percent_encode(query.country, NON_ALPHANUMERIC),
        );
        let body = format!(
            "f.req={}",
            utf8_percent_encode(&request_payload(&query), NON_ALPHANUMERIC)
        );

        let text = retry_with_backoff(self.retry, || {
            let url = url.clone();
            let body = body.clone();
            async move {
                rate.wait().await;
                let response = self
                    .client
                    .post(&url)
                    .header(reqwest::header::USER_AGENT, rate.next_identity())
                    .header(
                        reqwest::header::CONTENT_TYPE,
                        "application/x-www-form-urlencoded;charset=UTF-8",
                    )
                    .body(body)
                    .send()
                    .await?;
                crate::adapter::http::check_status(&response, &url)?;
                Ok(response.text().await?)
            }
        })
        .await?;

        parse_review_response(&text)
    }
}

/// Builds the `f.req` form value for a review page request.
fn request_payload(query: &ReviewQuery<'_>) -> String {
    let token = query.token.map_or(Value::Null, |t| Value::String(t.to_string()));
    let inner = json!([
        null,
        null,
        [2, query.sort, [query.count, null, token], null, []],
        [query.app_id, 7]
    ]);
    json!([[[RPC_ID, inner.to_string(), null, "generic"]]]).to_string()
}

/// Parses a raw `batchexecute` response body into a [`ReviewPage`].
///
/// # Errors
///
/// Returns [`ScraperError::Envelope`] if no `UsvDTd` envelope can be found, or
/// [`ScraperError::Deserialize`] if its payload is not valid JSON.
pub fn parse_review_response(body: &str) -> Result<ReviewPage, ScraperError> {
    let stripped = body.trim_start().trim_start_matches(")]}'").trim();

    let envelope = serde_json::from_str::<Value>(stripped)
        .ok()
        .or_else(|| {
            stripped
                .lines()
                .filter(|line| line.trim_start().starts_with('['))
                .find_map(|line| serde_json::from_str::<Value>(line).ok())
        })
        .ok_or_else(|| ScraperError::Envelope {
            context: "play store reviews".to_string(),
            reason: "response body contains no JSON envelope".to_string(),
        })?;

    let entry = envelope
        .as_array()
        .into_iter()
        .flatten()
        .find(|e| e.get(1).and_then(Value::as_str) == Some(RPC_ID))
        .ok_or_else(|| ScraperError::Envelope {
            context: "play store reviews".to_string(),
            reason: format!("no {RPC_ID} entry in envelope"),
        })?;

    let Some(payload) = entry.get(2).and_then(Value::as_str) else {
        // A null payload means the app has no (more) reviews.
        return Ok(ReviewPage::default());
    };

    let data: Value =
        serde_json::from_str(payload).map_err(|source| ScraperError::Deserialize {
            context: "play store review payload".to_string(),
            source,
        })?;

    let reviews = data
        .get(0)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_review).collect())
        .unwrap_or_default();

    let next_token = data
        .get(1)
        .and_then(|v| v.get(1))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Ok(ReviewPage {
        reviews,
        next_token,
    })
}

/// Maps one positional review array to named fields.
fn parse_review(item: &Value) -> Option<Map<String, Value>> {
    let review_id = item.get(0)?.as_str()?;

    let mut out = Map::new();
    out.insert("reviewId".into(), Value::String(review_id.to_string()));
    for &(key, path) in REVIEW_FIELDS {
        let value = pluck(item, path).cloned().unwrap_or(Value::Null);
        out.insert(key.to_string(), value);
    }
    Some(out)
}

fn pluck<'a>(item: &'a Value, path: &[usize]) -> Option<&'a Value> {
    path.iter()
        .try_fold(item, |v, &i| v.get(i))
        .filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(payload: &Value) -> String {
        let envelope = json!([["wrb.fr", RPC_ID, payload.to_string(), null, null, null, "generic"]]);
        format!(")]}}'\n\n{envelope}")
    }

    fn review_item(id: &str, name: &str, score: u8, text: &str) -> Value {
        json!([
            id,
            [name, [null, null, null, [null, null, "https://img.example/a.png"]]],
            score,
            null,
            text,
            [1_700_000_000, 0],
            3,
            null,
            null,
            null,
            "1.2.3"
        ])
    }

    #[test]
    fn payload_embeds_app_and_token() {
        let query = ReviewQuery {
            app_id: "com.acme.app",
            language: "en",
            country: "us",
            sort: 2,
            count: 40,
            token: Some("tok"),
        };
        let payload = request_payload(&query);
        let outer: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(outer[0][0][0], RPC_ID);
        let inner: Value = serde_json::from_str(outer[0][0][1].as_str().unwrap()).unwrap();
        assert_eq!(inner[2][1], 2);
        assert_eq!(inner[2][2], json!([40, null, "tok"]));
        assert_eq!(inner[3], json!(["com.acme.app", 7]));
    }

    #[test]
    fn parses_reviews_and_token() {
        let payload = json!([
            [review_item("gp:1", "Ana", 5, "Love it"), review_item("gp:2", "Bo", 1, "Hate it")],
            [null, "next-token"]
        ]);
        let page = parse_review_response(&wrap(&payload)).unwrap();
        assert_eq!(page.reviews.len(), 2);
        assert_eq!(page.next_token.as_deref(), Some("next-token"));
        let first = &page.reviews[0];
        assert_eq!(first["userName"], "Ana");
        assert_eq!(first["score"], 5);
        assert_eq!(first["content"], "Love it");
        assert_eq!(first["at"], 1_700_000_000);
        assert_eq!(first["appVersion"], "1.2.3");
    }

    #[test]
    fn missing_token_means_last_page() {
        let payload = json!([[review_item("gp:1", "Ana", 5, "Love it")], null]);
        let page = parse_review_response(&wrap(&payload)).unwrap();
        assert_eq!(page.reviews.len(), 1);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn null_payload_is_empty_page() {
        let body = format!(
            ")]}}'\n\n{}",
            json!([["wrb.fr", RPC_ID, null, null, null, null, "generic"]])
        );
        let page = parse_review_response(&body).unwrap();
        assert!(page.reviews.is_empty());
        assert!(page.next_token.is_none());
    }

    #[test]
    fn garbage_body_is_envelope_error() {
        let err = parse_review_response("<html>blocked</html>").unwrap_err();
        assert!(matches!(err, ScraperError::Envelope { .. }));
    }

    #[test]
    fn malformed_items_are_skipped() {
        let payload = json!([[42, review_item("gp:3", "Cy", 3, "Meh")], null]);
        let page = parse_review_response(&wrap(&payload)).unwrap();
        assert_eq!(page.reviews.len(), 1);
        assert_eq!(page.reviews[0]["reviewId"], "gp:3");
    }
}
