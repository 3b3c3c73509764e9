//! Batch coordinator: runs the orchestrator for every (entity, source) pair
//! of a job, sequentially, and merges the results.

use revharvest_core::{EntityConfig, ProductMeta, Review, Source, SourceResult};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::adapter::AdapterFactory;
use crate::error::JobError;
use crate::harvest::{harvest, report_safely};
use crate::progress::{JobProgress, ProgressEvent, ProgressReporter};

/// What to do with reviews collected by a source that later failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartialPolicy {
    Keep,
    /// Failed sources contribute no reviews, so `total_reviews` counts only
    /// successful sources.
    #[default]
    Discard,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    pub partial: PartialPolicy,
}

/// Combined output of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub reviews: Vec<Review>,
    pub sources: Vec<SourceResult>,
    pub total_reviews: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<ProductMeta>>,
}

pub struct BatchCoordinator<F> {
    factory: F,
    options: BatchOptions,
}

impl<F: AdapterFactory> BatchCoordinator<F> {
    pub fn new(factory: F, options: BatchOptions) -> Self {
        Self { factory, options }
    }

    /// Harvests every configured source of every entity, in order.
    ///
    /// Failures of individual entities or sources are recorded in
    /// [`BatchResult::sources`] and never abort the run.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::NoEntities`] for an empty entity list and
    /// [`JobError::NoTargets`] when no entity has any source configured.
    pub async fn run<R>(
        &self,
        entities: &[EntityConfig],
        reporter: &R,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, JobError>
    where
        R: ProgressReporter + ?Sized,
    {
        if entities.is_empty() {
            return Err(JobError::NoEntities);
        }
        if entities.iter().all(|e| e.sources.is_empty()) {
            return Err(JobError::NoTargets);
        }

        let total = entities.len();
        let mut reviews = Vec::new();
        let mut sources = Vec::new();
        let mut products: Option<Vec<ProductMeta>> = None;

        for (index, entity) in entities.iter().enumerate() {
            let company = entity.name.as_str();
            job_event(reporter, company, None, index, total, "starting entity");

            for target in &entity.sources {
                let source = target.source();
                job_event(
                    reporter,
                    company,
                    Some(source),
                    index,
                    total,
                    &format!("harvesting {}", source.display_name()),
                );

                if source == Source::Ecommerce {
                    products.get_or_insert_with(Vec::new);
                }

                if cancel.is_cancelled() {
                    sources.push(SourceResult::failure(source, company, 0, "harvest cancelled"));
                    continue;
                }

                let mut adapter = match self.factory.build(company, target) {
                    Ok(adapter) => adapter,
                    Err(e) => {
                        tracing::warn!(
                            company,
                            source = %source,
                            error = %e,
                            "failed to build adapter; skipping source"
                        );
                        sources.push(SourceResult::failure(source, company, 0, e.to_string()));
                        continue;
                    }
                };

                let outcome =
                    harvest(&mut adapter, company, target.target(), reporter, cancel).await;

                let keep = outcome.result.is_success()
                    || self.options.partial == PartialPolicy::Keep;
                if keep {
                    reviews.extend(outcome.reviews);
                    if let Some(list) = products.as_mut() {
                        list.extend(outcome.products);
                    }
                }
                sources.push(outcome.result);
            }

            job_event(reporter, company, None, index + 1, total, "entity complete");
        }

        let total_reviews = reviews.len();
        tracing::info!(
            entities = total,
            sources = sources.len(),
            total_reviews,
            "batch harvest finished"
        );

        Ok(BatchResult {
            reviews,
            sources,
            total_reviews,
            products,
        })
    }
}

fn job_event<R: ProgressReporter + ?Sized>(
    reporter: &R,
    entity: &str,
    source: Option<Source>,
    completed: usize,
    total: usize,
    step: &str,
) {
    let percent = u8::try_from(completed * 100 / total.max(1)).unwrap_or(100);
    let event = ProgressEvent::Job(JobProgress {
        current_entity: entity.to_string(),
        current_source: source.map(|s| s.display_name().to_string()),
        progress_percent: percent,
        step: step.to_string(),
        completed_entities: completed,
        total_entities: total,
    });
    report_safely(reporter, &event);
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;
