//! Analysis pipeline orchestration.

use std::collections::{BTreeMap, HashMap};

use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::classifier::ReviewClassifier;
use crate::types::{AnalyzedReview, Labels, ReviewText};

/// Knobs for [`analyze_reviews`].
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    /// Categories with fewer member reviews get no knowledge-base entry.
    pub min_category_size: usize,
    /// Reviews sent to `summarize` per category, sampled uniformly.
    pub summary_sample: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            min_category_size: 3,
            summary_sample: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisStats {
    pub total_reviews: usize,
    /// Percent of reviews labelled positive, one decimal place.
    pub positive_sentiment: f64,
    /// Percent of reviews labelled negative, one decimal place.
    pub negative_sentiment: f64,
    pub categories: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport<T> {
    pub reviews: Vec<AnalyzedReview<T>>,
    /// Issue type to Markdown summary.
    pub knowledge_base: BTreeMap<String, String>,
    pub stats: AnalysisStats,
    /// Issue types in first-seen order.
    pub categories: Vec<String>,
}

/// Classifies every review, groups them by issue type, and summarizes each
/// large enough group.
///
/// 1. Classify each review; a failure substitutes [`Labels::neutral`].
/// 2. Group review texts by `issue_type`, keeping first-seen order.
/// 3. Summarize each group with at least `min_category_size` members from a
///    uniform sample of at most `summary_sample`. A failed summary is logged
///    and the category left out of the knowledge base.
/// 4. Compute sentiment percentages.
pub async fn analyze_reviews<T, C>(
    reviews: Vec<T>,
    classifier: &C,
    options: &AnalysisOptions,
) -> AnalysisReport<T>
where
    T: ReviewText,
    C: ReviewClassifier + ?Sized,
{
    let total = reviews.len();
    let mut analyzed = Vec::with_capacity(total);
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();

    for (i, review) in reviews.into_iter().enumerate() {
        let labels = match classifier
            .classify(review.content(), review.title(), review.rating())
            .await
        {
            Ok(labels) => labels,
            Err(e) => {
                tracing::warn!(
                    review = i,
                    error = %e,
                    "classification failed, using neutral labels"
                );
                Labels::neutral()
            }
        };

        let category = if labels.issue_type.trim().is_empty() {
            Labels::neutral().issue_type
        } else {
            labels.issue_type.clone()
        };
        groups
            .entry(category.clone())
            .or_insert_with(|| {
                order.push(category);
                Vec::new()
            })
            .push(review.content().to_string());

        if (i + 1) % 25 == 0 {
            tracing::info!(done = i + 1, total, "classified reviews");
        }
        analyzed.push(AnalyzedReview { review, labels });
    }

    let mut knowledge_base = BTreeMap::new();
    for category in &order {
        let Some(members) = groups.get(category) else {
            continue;
        };
        if members.len() < options.min_category_size {
            tracing::debug!(
                category = %category,
                members = members.len(),
                "too few reviews to summarize"
            );
            continue;
        }

        let sample: Vec<&str> = {
            let mut rng = rand::rng();
            members
                .choose_multiple(&mut rng, options.summary_sample)
                .map(String::as_str)
                .collect()
        };

        match classifier.summarize(category, &sample).await {
            Ok(summary) => {
                knowledge_base.insert(category.clone(), summary);
            }
            Err(e) => {
                tracing::warn!(
                    category = %category,
                    error = %e,
                    "summary failed, omitting category"
                );
            }
        }
    }

    let positive = analyzed.iter().filter(|r| r.labels.is_positive()).count();
    let negative = analyzed.iter().filter(|r| r.labels.is_negative()).count();
    let stats = AnalysisStats {
        total_reviews: total,
        positive_sentiment: percent(positive, total),
        negative_sentiment: percent(negative, total),
        categories: order.len(),
    };

    tracing::info!(
        reviews = total,
        categories = order.len(),
        summaries = knowledge_base.len(),
        "analysis finished"
    );

    AnalysisReport {
        reviews: analyzed,
        knowledge_base,
        stats,
        categories: order,
    }
}

/// `part / total` as a percentage rounded to one decimal. `0.0` when `total` is 0.
#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = part as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
