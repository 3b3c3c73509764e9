use revharvest_core::Review;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const NEUTRAL: &str = "Neutral";
const DEFAULT_ASPECT: &str = "Other";
const DEFAULT_ISSUE_TYPE: &str = "General Feedback";
const DEFAULT_URGENCY: &str = "Low";
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Classification attached to one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Labels {
    /// `Positive`, `Negative` or `Neutral`.
    pub sentiment: String,
    /// `Product`, `Service` or `Other`.
    pub aspect: String,
    pub issue_type: String,
    /// In `[0.0, 1.0]`.
    pub confidence: f64,
    /// In `[-1.0, 1.0]`.
    pub sentiment_score: f64,
    pub emotions: Vec<String>,
    /// `High`, `Medium` or `Low`.
    pub urgency: String,
}

impl Labels {
    /// The labels substituted whenever classification fails.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            sentiment: NEUTRAL.to_string(),
            aspect: DEFAULT_ASPECT.to_string(),
            issue_type: DEFAULT_ISSUE_TYPE.to_string(),
            confidence: DEFAULT_CONFIDENCE,
            sentiment_score: 0.0,
            emotions: vec![NEUTRAL.to_string()],
            urgency: DEFAULT_URGENCY.to_string(),
        }
    }

    /// Builds labels from a possibly incomplete JSON object, filling each
    /// missing or mistyped field from [`Labels::neutral`].
    ///
    /// `urgency_level` is read when `urgency` is absent, and `key_emotions`
    /// when `emotions` is absent.
    #[must_use]
    pub fn from_partial(obj: &Map<String, Value>) -> Self {
        let defaults = Self::neutral();

        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let emotions = ["emotions", "key_emotions"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_array))
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.emotions);

        Self {
            sentiment: text("sentiment").unwrap_or(defaults.sentiment),
            aspect: text("aspect").unwrap_or(defaults.aspect),
            issue_type: text("issue_type").unwrap_or(defaults.issue_type),
            confidence: number(obj, "confidence")
                .map_or(defaults.confidence, |c| c.clamp(0.0, 1.0)),
            sentiment_score: number(obj, "sentiment_score")
                .map_or(defaults.sentiment_score, |s| s.clamp(-1.0, 1.0)),
            emotions,
            urgency: text("urgency")
                .or_else(|| text("urgency_level"))
                .unwrap_or(defaults.urgency),
        }
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.sentiment.eq_ignore_ascii_case("positive")
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.sentiment.eq_ignore_ascii_case("negative")
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::neutral()
    }
}

fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    let parsed = match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// The parts of a review a classifier looks at.
pub trait ReviewText {
    fn content(&self) -> &str;
    fn title(&self) -> &str;
    fn rating(&self) -> Option<f64>;
}

impl ReviewText for Review {
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

/// A review with its labels, serialized as one flat object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedReview<T> {
    #[serde(flatten)]
    pub review: T,
    #[serde(flatten)]
    pub labels: Labels,
}
