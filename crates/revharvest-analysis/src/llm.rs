//! Client for OpenAI-compatible chat-completions endpoints.
//!
//! Implements [`ReviewClassifier`] by prompting for a JSON label object per
//! review and a Markdown summary per category. Replies are parsed leniently:
//! see [`parse_labels`].

use std::time::Duration;

use reqwest::{Client, Url};
use revharvest_core::AppConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classifier::ReviewClassifier;
use crate::error::AnalysisError;
use crate::types::Labels;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const CLASSIFY_MAX_TOKENS: u32 = 1000;
const SUMMARY_MAX_TOKENS: u32 = 1500;
const CLASSIFY_TEMPERATURE: f32 = 0.1;
const SUMMARY_TEMPERATURE: f32 = 0.3;

const CLASSIFY_PROMPT: &str = r#"You label customer reviews.

Decide:
1. sentiment: "Positive" or "Negative".
2. aspect: what the customer mainly talks about, one of "Product", "Service", "Other".
3. issue_type: a specific category, for example
   Product: "Quality Issue", "Functionality Issue", "Design Issue", "Durability Issue", "Product Defect"
   Service: "Customer Support Issue", "Delivery Issue", "Logistics Issue", "Response Time Issue", "Installation Issue"
   Other: "Pricing Issue", "Policy Issue", "Website Issue", "App Issue", "Documentation Issue"
4. sentiment_score: -1.0 (very negative) to 1.0 (very positive).
5. emotions: the main emotions expressed, e.g. ["frustration", "disappointment"].
6. urgency: "High", "Medium" or "Low".
7. confidence: 0.0 to 1.0 for the labels as a whole.

Reply with one JSON object and nothing else:
{"sentiment": "...", "aspect": "...", "issue_type": "...", "sentiment_score": 0.0, "emotions": ["..."], "urgency": "...", "confidence": 0.0}"#;

/// Chat-completions client. One instance is reused for every call in a run.
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: Url,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmClient {
    /// Creates a client for the public `OpenAI` API.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, AnalysisError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client for any compatible endpoint (or a wiremock server).
    ///
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`;
    /// requests go to `{base_url}/chat/completions`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`AnalysisError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("revharvest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|root| root.join("chat/completions"))
            .map_err(|e| AnalysisError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            endpoint,
        })
    }

    /// # Errors
    ///
    /// Returns [`AnalysisError::MissingApiKey`] when no key is configured,
    /// otherwise as [`LlmClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, AnalysisError> {
        let api_key = config
            .llm_api_key
            .as_deref()
            .ok_or(AnalysisError::MissingApiKey)?;
        Self::with_base_url(
            api_key,
            &config.llm_model,
            config.request_timeout_secs,
            &config.llm_base_url,
        )
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f32,
        json_mode: bool,
        context: &str,
    ) -> Result<String, AnalysisError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens,
            temperature,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::UnexpectedStatus {
                status: status.as_u16(),
                context: context.to_string(),
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| AnalysisError::Deserialize {
                context: context.to_string(),
                source: e,
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AnalysisError::EmptyResponse {
                context: context.to_string(),
            })
    }
}

impl ReviewClassifier for LlmClient {
    async fn classify(
        &self,
        content: &str,
        title: &str,
        rating: Option<f64>,
    ) -> Result<Labels, AnalysisError> {
        let prompt = review_prompt(content, title, rating);
        let reply = self
            .complete(
                CLASSIFY_PROMPT,
                &prompt,
                CLASSIFY_MAX_TOKENS,
                CLASSIFY_TEMPERATURE,
                true,
                "classify",
            )
            .await?;
        parse_labels(&reply)
    }

    async fn summarize(&self, issue_type: &str, sample: &[&str]) -> Result<String, AnalysisError> {
        let system = summary_prompt(issue_type);
        let user = format!(
            "Here are the reviews related to {issue_type}:\n\n{}",
            sample.join("\n---\n")
        );
        self.complete(
            &system,
            &user,
            SUMMARY_MAX_TOKENS,
            SUMMARY_TEMPERATURE,
            false,
            "summarize",
        )
        .await
    }
}

fn summary_prompt(issue_type: &str) -> String {
    format!(
        "You are a customer experience expert. From the reviews about \"{issue_type}\", write a \
         summary covering:\n\
         1. The common issues and pain points\n\
         2. What customers expect\n\
         3. Proposed solutions or best practices\n\
         4. Training recommendations for staff\n\
         5. Feedback for vendors or product improvements\n\n\
         Format the answer as Markdown with headers and bullet points."
    )
}

/// User message for one review. Title and rating lines are omitted when absent.
#[must_use]
pub fn review_prompt(content: &str, title: &str, rating: Option<f64>) -> String {
    let mut prompt = String::new();
    if !title.trim().is_empty() {
        prompt.push_str(&format!("Title: {}\n", title.trim()));
    }
    if let Some(rating) = rating {
        prompt.push_str(&format!("Rating: {rating}\n"));
    }
    prompt.push_str(&format!("Content: {}", content.trim()));
    prompt
}

/// Parses a classification reply.
///
/// The JSON object is taken from the first `{` to the last `}` so prose or
/// code fences around it are ignored; missing fields come from
/// [`Labels::neutral`].
///
/// # Errors
///
/// Returns [`AnalysisError::NoJsonObject`] when the reply has no braces, or
/// [`AnalysisError::Deserialize`] when the braced text is not a JSON object.
pub fn parse_labels(reply: &str) -> Result<Labels, AnalysisError> {
    let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) else {
        return Err(AnalysisError::NoJsonObject);
    };
    if end < start {
        return Err(AnalysisError::NoJsonObject);
    }

    let obj: Map<String, Value> =
        serde_json::from_str(&reply[start..=end]).map_err(|e| AnalysisError::Deserialize {
            context: "classification reply".to_string(),
            source: e,
        })?;
    Ok(Labels::from_partial(&obj))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_optional_lines_only_when_present() {
        assert_eq!(review_prompt("Great", "", None), "Content: Great");
        assert_eq!(
            review_prompt(" Slow ", "Late parcel", Some(2.0)),
            "Title: Late parcel\nRating: 2\nContent: Slow"
        );
    }

    #[test]
    fn parses_object_wrapped_in_prose() {
        let reply = "Sure! ```json\n{\"sentiment\": \"Positive\", \"aspect\": \"Product\", \
                     \"issue_type\": \"Quality Issue\", \"confidence\": 0.9}\n``` Hope that helps.";
        let labels = parse_labels(reply).unwrap();
        assert_eq!(labels.sentiment, "Positive");
        assert_eq!(labels.aspect, "Product");
        assert_eq!(labels.issue_type, "Quality Issue");
        assert!((labels.confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(labels.urgency, "Low");
    }

    #[test]
    fn reply_without_braces_is_an_error() {
        assert!(matches!(
            parse_labels("I cannot help with that."),
            Err(AnalysisError::NoJsonObject)
        ));
        assert!(matches!(parse_labels("} {"), Err(AnalysisError::NoJsonObject)));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            parse_labels("{sentiment: Positive}"),
            Err(AnalysisError::Deserialize { .. })
        ));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = LlmClient::with_base_url("key", "model", 5, "not a url");
        assert!(matches!(result, Err(AnalysisError::InvalidBaseUrl { .. })));
    }
}
