use std::future::Future;

use crate::error::AnalysisError;
use crate::types::Labels;

/// Labels single reviews and writes category summaries.
///
/// Callers substitute [`Labels::neutral`] when `classify` fails, and drop the
/// category when `summarize` fails.
pub trait ReviewClassifier: Send + Sync {
    fn classify(
        &self,
        content: &str,
        title: &str,
        rating: Option<f64>,
    ) -> impl Future<Output = Result<Labels, AnalysisError>> + Send;

    /// Returns a Markdown summary of `sample`, the reviews filed under
    /// `issue_type`.
    fn summarize(
        &self,
        issue_type: &str,
        sample: &[&str],
    ) -> impl Future<Output = Result<String, AnalysisError>> + Send;
}
