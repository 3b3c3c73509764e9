//! `harvest` and `validate` command handlers.

use std::path::{Path, PathBuf};

use revharvest_core::{AppConfig, HarvestJob, SourceStatus};
use revharvest_scraper::{
    AdapterFactory, BatchCoordinator, BatchOptions, BatchResult, HttpAdapterFactory,
    PartialPolicy, ProgressEvent, ProgressReporter, TracingReporter,
};
use tokio_util::sync::CancellationToken;

use crate::output::write_json;

#[derive(Debug)]
pub(crate) struct HarvestArgs {
    pub job_path: PathBuf,
    pub out: Option<PathBuf>,
    pub events: bool,
    pub keep_partial: bool,
}

/// Run every (entity, source) pair of the job and write the merged result.
///
/// Ctrl-C cancels the run; sources that finished before that point are
/// still written.
///
/// # Errors
///
/// Returns an error if the job file is invalid or the output cannot be
/// written. Individual source failures are reported in the result instead.
pub(crate) async fn run_harvest(config: &AppConfig, args: HarvestArgs) -> anyhow::Result<()> {
    let job = revharvest_core::load_job(&args.job_path)?;
    tracing::info!(
        path = %args.job_path.display(),
        entities = job.entities.len(),
        "loaded harvest job"
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current batch");
            interrupt.cancel();
        }
    });

    let events = args.events;
    let reporter = move |event: &ProgressEvent| {
        TracingReporter.report(event);
        if events {
            if let ProgressEvent::Job(progress) = event {
                match serde_json::to_string(progress) {
                    Ok(line) => eprintln!("{line}"),
                    Err(e) => tracing::warn!(error = %e, "failed to encode progress event"),
                }
            }
        }
    };

    let options = BatchOptions {
        partial: if args.keep_partial {
            PartialPolicy::Keep
        } else {
            PartialPolicy::Discard
        },
    };
    let coordinator = BatchCoordinator::new(HttpAdapterFactory::from_config(config), options);
    let result = coordinator.run(&job.entities, &reporter, &cancel).await?;

    log_summary(&result);
    write_json(&result, args.out.as_deref())
}

fn log_summary(result: &BatchResult) {
    for source in &result.sources {
        match source.status {
            SourceStatus::Success => tracing::info!(
                company = %source.company,
                source = %source.source_name,
                count = source.count,
                "source complete"
            ),
            SourceStatus::Error => tracing::warn!(
                company = %source.company,
                source = %source.source_name,
                count = source.count,
                error = source.error.as_deref().unwrap_or("unknown"),
                "source failed"
            ),
        }
    }
    tracing::info!(total_reviews = result.total_reviews, "harvest complete");
}

/// Load the job and build every adapter it needs without sending requests.
///
/// # Errors
///
/// Returns an error if the job file is invalid or any adapter cannot be
/// constructed from its target.
pub(crate) fn run_validate(config: &AppConfig, job_path: &Path) -> anyhow::Result<()> {
    let job = revharvest_core::load_job(job_path)?;
    check_adapters(&job, &HttpAdapterFactory::from_config(config))?;

    println!("{}: {} entities", job_path.display(), job.entities.len());
    for entity in &job.entities {
        let sources: Vec<String> = entity
            .sources
            .iter()
            .map(|t| format!("{} ({})", t.source(), t.target()))
            .collect();
        println!("  {}: {}", entity.name, sources.join(", "));
    }
    Ok(())
}

fn check_adapters<F: AdapterFactory>(job: &HarvestJob, factory: &F) -> anyhow::Result<()> {
    for entity in &job.entities {
        for target in &entity.sources {
            factory.build(&entity.name, target).map_err(|e| {
                anyhow::anyhow!(
                    "entity '{}': {} source is invalid: {e}",
                    entity.name,
                    target.source()
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn job_file(yaml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn validate_accepts_a_well_formed_job() {
        let file = job_file(
            "entities:\n  - name: Acme\n    sources:\n      - kind: review_aggregator\n        url: https://www.trustpilot.com/review/acme.com\n        target: 50\n",
        );
        run_validate(&crate::test_config(), file.path()).unwrap();
    }

    #[test]
    fn validate_rejects_an_empty_job() {
        let file = job_file("entities: []\n");
        let err = run_validate(&crate::test_config(), file.path()).unwrap_err();
        assert!(err.to_string().contains("at least one entity"), "{err}");
    }
}
