//! `analyze` command handler.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use revharvest_analysis::{
    analyze_reviews, knowledge_base_markdown, load_spreadsheet, write_knowledge_base_csv,
    AnalysisOptions, AnalysisReport, LexiconClassifier, LlmClient, ReviewClassifier, ReviewText,
};
use revharvest_core::{AppConfig, Review};
use serde::{Deserialize, Serialize};

use crate::output::write_json;

#[derive(Debug)]
pub(crate) struct AnalyzeArgs {
    pub input: PathBuf,
    pub out: Option<PathBuf>,
    pub knowledge_base: Option<PathBuf>,
    pub offline: bool,
}

/// Harvest output: either a full batch result or a bare review array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HarvestInput {
    Batch { reviews: Vec<Review> },
    Reviews(Vec<Review>),
}

/// Label the input reviews, then write the report and optional knowledge base.
///
/// # Errors
///
/// Returns an error if the input cannot be read, no LLM key is configured
/// without `--offline`, or an output file cannot be written.
pub(crate) async fn run_analyze(config: &AppConfig, args: AnalyzeArgs) -> anyhow::Result<()> {
    if is_csv(&args.input) {
        let reviews = load_spreadsheet(&args.input)?;
        dispatch(config, reviews, &args).await
    } else {
        let reviews = load_harvest_json(&args.input)?;
        dispatch(config, reviews, &args).await
    }
}

async fn dispatch<T>(
    config: &AppConfig,
    reviews: Vec<T>,
    args: &AnalyzeArgs,
) -> anyhow::Result<()>
where
    T: ReviewText + Serialize,
{
    if args.offline {
        analyze_and_write(reviews, &LexiconClassifier, args).await
    } else {
        let client = LlmClient::from_config(config)
            .context("LLM client unavailable; pass --offline to use the built-in lexicon")?;
        analyze_and_write(reviews, &client, args).await
    }
}

async fn analyze_and_write<T, C>(
    reviews: Vec<T>,
    classifier: &C,
    args: &AnalyzeArgs,
) -> anyhow::Result<()>
where
    T: ReviewText + Serialize,
    C: ReviewClassifier,
{
    let report = analyze_reviews(reviews, classifier, &AnalysisOptions::default()).await;
    tracing::info!(
        total_reviews = report.stats.total_reviews,
        positive = report.stats.positive_sentiment,
        negative = report.stats.negative_sentiment,
        categories = report.stats.categories,
        "analysis complete"
    );

    if let Some(path) = &args.knowledge_base {
        export_knowledge_base(&report, path)?;
    }
    write_json(&report, args.out.as_deref())
}

fn export_knowledge_base<T>(report: &AnalysisReport<T>, path: &Path) -> anyhow::Result<()> {
    let generated_at = chrono::Local::now().naive_local();
    if is_csv(path) {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        write_knowledge_base_csv(&report.knowledge_base, generated_at, BufWriter::new(file))?;
    } else {
        let markdown = knowledge_base_markdown(&report.knowledge_base, generated_at);
        std::fs::write(path, markdown)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    tracing::info!(
        path = %path.display(),
        entries = report.knowledge_base.len(),
        "wrote knowledge base"
    );
    Ok(())
}

fn load_harvest_json(path: &Path) -> anyhow::Result<Vec<Review>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_harvest_json(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_harvest_json(text: &str) -> serde_json::Result<Vec<Review>> {
    Ok(match serde_json::from_str(text)? {
        HarvestInput::Batch { reviews } | HarvestInput::Reviews(reviews) => reviews,
    })
}

fn is_csv(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REVIEW: &str = r#"{
        "username": "Jo",
        "review_content": "Slow delivery",
        "review_title": "",
        "rating": 2.0,
        "datetime": "2024-03-01T10:00:00Z",
        "source": "review_aggregator",
        "company": "Acme",
        "scraped_at": "2024-03-02T08:00:00Z",
        "verified": true
    }"#;

    #[test]
    fn csv_detection_ignores_case() {
        assert!(is_csv(Path::new("survey.CSV")));
        assert!(is_csv(Path::new("kb.csv")));
        assert!(!is_csv(Path::new("kb.md")));
        assert!(!is_csv(Path::new("reviews")));
    }

    #[test]
    fn parses_batch_result_object() {
        let text = format!(r#"{{"reviews":[{REVIEW}],"sources":[],"total_reviews":1}}"#);
        let reviews = parse_harvest_json(&text).unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].username, "Jo");
    }

    #[test]
    fn parses_bare_review_array() {
        let reviews = parse_harvest_json(&format!("[{REVIEW},{REVIEW}]")).unwrap();
        assert_eq!(reviews.len(), 2);
    }

    #[test]
    fn rejects_unrelated_json() {
        assert!(parse_harvest_json(r#"{"items":[]}"#).is_err());
    }

    #[tokio::test]
    async fn offline_analysis_writes_report_and_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("survey.csv");
        std::fs::write(
            &input,
            "date,user,review\n\
             2024-01-01,a,The delivery was late and the parcel arrived damaged\n\
             2024-01-02,b,Delivery took three weeks\n\
             2024-01-03,c,Late delivery again\n",
        )
        .unwrap();
        let out = dir.path().join("report.json");
        let kb = dir.path().join("kb.md");

        let args = AnalyzeArgs {
            input,
            out: Some(out.clone()),
            knowledge_base: Some(kb.clone()),
            offline: true,
        };
        let config = crate::test_config();
        run_analyze(&config, args).await.unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(report["stats"]["total_reviews"], 3);
        assert_eq!(report["reviews"].as_array().unwrap().len(), 3);

        let markdown = std::fs::read_to_string(&kb).unwrap();
        assert!(markdown.starts_with("# Knowledge Base\n\nGenerated on: "));
    }

    #[tokio::test]
    async fn missing_api_key_suggests_offline() {
        let args = AnalyzeArgs {
            input: PathBuf::from("unused.csv"),
            out: None,
            knowledge_base: None,
            offline: false,
        };
        let config = crate::test_config();
        let err = dispatch(&config, Vec::<Review>::new(), &args)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--offline"), "{err}");
    }
}
