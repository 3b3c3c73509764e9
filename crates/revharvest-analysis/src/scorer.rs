//! Offline review classifier built on word lexicons.
//!
//! Used when no LLM is configured (`--offline`). Sentiment comes from a
//! weighted lexicon blended with the star rating; aspect and issue type come
//! from the first keyword group the review mentions.

use crate::classifier::ReviewClassifier;
use crate::error::AnalysisError;
use crate::types::Labels;

/// Review word weights.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("great", 0.4),
    ("good", 0.3),
    ("excellent", 0.5),
    ("amazing", 0.5),
    ("love", 0.5),
    ("loved", 0.5),
    ("best", 0.5),
    ("recommend", 0.4),
    ("happy", 0.4),
    ("satisfied", 0.4),
    ("fast", 0.3),
    ("quick", 0.3),
    ("easy", 0.3),
    ("helpful", 0.4),
    ("friendly", 0.3),
    ("reliable", 0.4),
    ("perfect", 0.5),
    ("smooth", 0.3),
    ("thanks", 0.2),
    ("works", 0.2),
    // Negative signals
    ("bad", -0.4),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("worst", -0.6),
    ("horrible", -0.6),
    ("poor", -0.4),
    ("broken", -0.5),
    ("broke", -0.5),
    ("late", -0.3),
    ("slow", -0.3),
    ("rude", -0.5),
    ("refund", -0.3),
    ("scam", -0.7),
    ("useless", -0.6),
    ("disappointed", -0.5),
    ("disappointing", -0.5),
    ("crash", -0.5),
    ("crashes", -0.5),
    ("never", -0.2),
    ("waste", -0.5),
];

/// Keyword groups checked in order: `(aspect, issue_type, words)`.
const ISSUE_KEYWORDS: &[(&str, &str, &[&str])] = &[
    (
        "Service",
        "Delivery Issue",
        &["delivery", "delivered", "shipping", "shipped", "parcel", "package", "courier", "arrived"],
    ),
    (
        "Service",
        "Customer Support Issue",
        &["support", "agent", "representative", "helpdesk", "service", "staff", "refund"],
    ),
    (
        "Other",
        "App Issue",
        &["app", "crash", "crashes", "login", "update", "bug", "freezes"],
    ),
    (
        "Other",
        "Pricing Issue",
        &["price", "expensive", "overpriced", "fee", "fees", "cost", "charged"],
    ),
    (
        "Other",
        "Website Issue",
        &["website", "checkout", "site", "page"],
    ),
    (
        "Product",
        "Durability Issue",
        &["broke", "broken", "lasted", "stopped", "wore"],
    ),
    (
        "Product",
        "Quality Issue",
        &["quality", "cheap", "flimsy", "defective", "damaged"],
    ),
    (
        "Product",
        "Functionality Issue",
        &["feature", "features", "function", "battery", "setup"],
    ),
];

const EMOTIONS: &[(&str, &[&str])] = &[
    ("joy", &["love", "loved", "amazing", "delighted"]),
    ("satisfaction", &["great", "good", "satisfied", "happy", "perfect"]),
    ("frustration", &["frustrating", "frustrated", "annoying", "again"]),
    ("anger", &["angry", "furious", "scam", "rude", "worst"]),
    ("disappointment", &["disappointed", "disappointing", "expected"]),
];

/// Sentiment below this magnitude counts as neutral.
const NEUTRAL_BAND: f32 = 0.05;

/// Score a text string using the review lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps
/// the result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    for word in words(text) {
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == word) {
            score += weight;
        }
    }
    score.clamp(-1.0, 1.0)
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphabetic())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
}

/// Maps a 1-5 star rating onto `[-1.0, 1.0]`.
#[allow(clippy::cast_possible_truncation)]
fn rating_score(rating: Option<f64>) -> Option<f32> {
    rating
        .filter(|r| (1.0..=5.0).contains(r))
        .map(|r| ((r - 3.0) / 2.0) as f32)
}

/// Classifier that needs no network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    /// Labels one review synchronously.
    #[must_use]
    pub fn label(content: &str, title: &str, rating: Option<f64>) -> Labels {
        let text = format!("{title} {content}");
        let text_score = lexicon_score(&text);
        let score = match rating_score(rating) {
            Some(stars) if text_score.abs() < f32::EPSILON => stars,
            Some(stars) => (text_score + stars) / 2.0,
            None => text_score,
        };

        let sentiment = if score > NEUTRAL_BAND {
            "Positive"
        } else if score < -NEUTRAL_BAND {
            "Negative"
        } else {
            "Neutral"
        };

        let tokens: Vec<String> = words(&text).collect();
        let mentions = |group: &[&str]| tokens.iter().any(|t| group.contains(&t.as_str()));

        let (aspect, issue_type) = ISSUE_KEYWORDS
            .iter()
            .find(|&&(_, _, group)| mentions(group))
            .map_or(("Other", "General Feedback"), |(aspect, issue, _)| {
                (*aspect, *issue)
            });

        let mut emotions: Vec<String> = EMOTIONS
            .iter()
            .filter(|&&(_, group)| mentions(group))
            .map(|(emotion, _)| (*emotion).to_string())
            .collect();
        if emotions.is_empty() {
            emotions.push("Neutral".to_string());
        }

        let urgency = if score <= -0.5 {
            "High"
        } else if score < -NEUTRAL_BAND {
            "Medium"
        } else {
            "Low"
        };

        Labels {
            sentiment: sentiment.to_string(),
            aspect: aspect.to_string(),
            issue_type: issue_type.to_string(),
            confidence: f64::from(0.5 + 0.4 * score.abs()),
            sentiment_score: f64::from(score),
            emotions,
            urgency: urgency.to_string(),
        }
    }
}

impl ReviewClassifier for LexiconClassifier {
    async fn classify(
        &self,
        content: &str,
        title: &str,
        rating: Option<f64>,
    ) -> Result<Labels, AnalysisError> {
        Ok(Self::label(content, title, rating))
    }

    async fn summarize(&self, issue_type: &str, sample: &[&str]) -> Result<String, AnalysisError> {
        Ok(digest(issue_type, sample))
    }
}

const QUOTE_CHARS: usize = 200;

/// Markdown digest listing the sampled reviews.
fn digest(issue_type: &str, sample: &[&str]) -> String {
    let mut out = format!(
        "### Overview\n\n{} sampled reviews were filed under **{issue_type}**.\n\n### Sample feedback\n\n",
        sample.len()
    );
    for review in sample {
        let trimmed = review.trim();
        let quote: String = trimmed.chars().take(QUOTE_CHARS).collect();
        let ellipsis = if trimmed.chars().count() > QUOTE_CHARS {
            "..."
        } else {
            ""
        };
        out.push_str("- \"");
        out.push_str(&quote);
        out.push_str(ellipsis);
        out.push_str("\"\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_returns_zero() {
        assert_eq!(lexicon_score(""), 0.0);
    }

    #[test]
    fn unknown_text_returns_zero() {
        assert_eq!(lexicon_score("a blue chair"), 0.0);
    }

    #[test]
    fn punctuation_stripped_from_words() {
        assert!(lexicon_score("great!") > 0.0);
        assert!(lexicon_score("Terrible.") < 0.0);
    }

    #[test]
    fn score_clamps_to_range() {
        assert_eq!(lexicon_score("great excellent best love recommend perfect"), 1.0);
        assert_eq!(lexicon_score("terrible awful worst horrible scam useless"), -1.0);
    }

    #[test]
    fn late_delivery_is_negative_service_issue() {
        let labels = LexiconClassifier::label(
            "The parcel arrived two weeks late and support was rude.",
            "",
            Some(1.0),
        );
        assert_eq!(labels.sentiment, "Negative");
        assert_eq!(labels.aspect, "Service");
        assert_eq!(labels.issue_type, "Delivery Issue");
        assert_eq!(labels.urgency, "High");
        assert!(labels.emotions.contains(&"anger".to_string()));
    }

    #[test]
    fn rating_decides_when_text_is_neutral() {
        let labels = LexiconClassifier::label("It is a chair.", "", Some(5.0));
        assert_eq!(labels.sentiment, "Positive");
        assert!((labels.sentiment_score - 1.0).abs() < 1e-6);
        assert_eq!(labels.issue_type, "General Feedback");
        assert_eq!(labels.emotions, vec!["Neutral"]);
    }

    #[test]
    fn no_signal_is_neutral() {
        let labels = LexiconClassifier::label("It is a chair.", "", None);
        assert_eq!(labels.sentiment, "Neutral");
        assert_eq!(labels.urgency, "Low");
        assert!((labels.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_rating_is_ignored() {
        let labels = LexiconClassifier::label("It is a chair.", "", Some(9.0));
        assert_eq!(labels.sentiment, "Neutral");
    }

    #[test]
    fn digest_quotes_and_truncates() {
        let long = "x".repeat(250);
        let md = digest("Delivery Issue", &["Late again", &long]);
        assert!(md.contains("**Delivery Issue**"));
        assert!(md.contains("- \"Late again\""));
        assert!(md.contains(&format!("- \"{}...\"", "x".repeat(200))));
    }
}
