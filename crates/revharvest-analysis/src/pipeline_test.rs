use std::sync::Mutex;

use super::*;
use crate::error::AnalysisError;

#[derive(Clone)]
struct Text(&'static str);

impl ReviewText for Text {
    fn content(&self) -> &str {
        self.0
    }

    fn title(&self) -> &str {
        ""
    }

    fn rating(&self) -> Option<f64> {
        None
    }
}

impl Serialize for Text {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("review_content", self.0)?;
        map.end()
    }
}

/// Labels by the first word of the review: `pos`, `neg`, `fail` (error) or
/// anything else (neutral, "General Feedback").
#[derive(Default)]
struct ScriptedClassifier {
    summarized: Mutex<Vec<(String, usize)>>,
}

impl ReviewClassifier for ScriptedClassifier {
    async fn classify(
        &self,
        content: &str,
        _title: &str,
        _rating: Option<f64>,
    ) -> Result<Labels, AnalysisError> {
        let mut labels = Labels::neutral();
        match content.split_whitespace().next() {
            Some("pos") => {
                labels.sentiment = "Positive".into();
                labels.issue_type = "Praise".into();
            }
            Some("neg") => {
                labels.sentiment = "Negative".into();
                labels.issue_type = "Delivery Issue".into();
            }
            Some("bad-summary") => {
                labels.issue_type = "Unsummarizable".into();
            }
            Some("fail") => {
                return Err(AnalysisError::EmptyResponse {
                    context: "classify".into(),
                })
            }
            _ => {}
        }
        Ok(labels)
    }

    async fn summarize(&self, issue_type: &str, sample: &[&str]) -> Result<String, AnalysisError> {
        self.summarized
            .lock()
            .unwrap()
            .push((issue_type.to_string(), sample.len()));
        if issue_type == "Unsummarizable" {
            return Err(AnalysisError::EmptyResponse {
                context: "summarize".into(),
            });
        }
        Ok(format!("summary of {issue_type}"))
    }
}

fn texts(items: &[&'static str]) -> Vec<Text> {
    items.iter().map(|t| Text(*t)).collect()
}

#[tokio::test]
async fn groups_summarizes_and_counts() {
    let classifier = ScriptedClassifier::default();
    let reviews = texts(&[
        "neg late", "pos lovely", "neg lost", "neg damaged box", "pos quick", "other",
    ]);

    let report = analyze_reviews(reviews, &classifier, &AnalysisOptions::default()).await;

    assert_eq!(report.categories, vec!["Delivery Issue", "Praise", "General Feedback"]);
    assert_eq!(report.knowledge_base.len(), 1);
    assert_eq!(report.knowledge_base["Delivery Issue"], "summary of Delivery Issue");

    assert_eq!(report.stats.total_reviews, 6);
    assert!((report.stats.positive_sentiment - 33.3).abs() < 1e-9);
    assert!((report.stats.negative_sentiment - 50.0).abs() < 1e-9);
    assert_eq!(report.stats.categories, 3);

    assert_eq!(report.reviews.len(), 6);
    assert_eq!(report.reviews[0].labels.sentiment, "Negative");
}

#[tokio::test]
async fn failed_classification_becomes_neutral() {
    let classifier = ScriptedClassifier::default();
    let report = analyze_reviews(
        texts(&["fail one", "fail two", "fail three"]),
        &classifier,
        &AnalysisOptions::default(),
    )
    .await;

    assert!(report.reviews.iter().all(|r| r.labels == Labels::neutral()));
    assert_eq!(report.categories, vec!["General Feedback"]);
    assert!(report.knowledge_base.contains_key("General Feedback"));
    assert!((report.stats.positive_sentiment).abs() < f64::EPSILON);
}

#[tokio::test]
async fn summary_sample_is_capped() {
    let classifier = ScriptedClassifier::default();
    let reviews: Vec<Text> = std::iter::repeat_n(Text("neg again"), 40).collect();

    analyze_reviews(reviews, &classifier, &AnalysisOptions::default()).await;

    let calls = classifier.summarized.into_inner().unwrap();
    assert_eq!(calls, vec![("Delivery Issue".to_string(), 15)]);
}

#[tokio::test]
async fn failed_summary_omits_category() {
    let classifier = ScriptedClassifier::default();
    let reviews = texts(&["bad-summary a", "bad-summary b", "bad-summary c"]);

    let report = analyze_reviews(reviews, &classifier, &AnalysisOptions::default()).await;

    assert_eq!(report.categories, vec!["Unsummarizable"]);
    assert!(report.knowledge_base.is_empty());
}

#[tokio::test]
async fn empty_input_has_zero_stats() {
    let classifier = ScriptedClassifier::default();
    let report = analyze_reviews(Vec::<Text>::new(), &classifier, &AnalysisOptions::default()).await;

    assert_eq!(report.stats.total_reviews, 0);
    assert!(report.stats.positive_sentiment.abs() < f64::EPSILON);
    assert!(report.categories.is_empty());
}

#[tokio::test]
async fn analyzed_review_serializes_flat() {
    let classifier = ScriptedClassifier::default();
    let report = analyze_reviews(texts(&["pos nice"]), &classifier, &AnalysisOptions::default()).await;

    let json = serde_json::to_value(&report).unwrap();
    let first = &json["reviews"][0];
    assert_eq!(first["review_content"], "pos nice");
    assert_eq!(first["sentiment"], "Positive");
    assert_eq!(first["issue_type"], "Praise");
    assert_eq!(json["stats"]["positive_sentiment"], 100.0);
}

#[test]
fn percent_rounds_to_one_decimal() {
    assert!((percent(1, 3) - 33.3).abs() < 1e-9);
    assert!((percent(2, 3) - 66.7).abs() < 1e-9);
    assert!(percent(0, 0).abs() < f64::EPSILON);
}
