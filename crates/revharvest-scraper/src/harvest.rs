//! Harvest orchestrator: drives one adapter until the target count is met,
//! the source is exhausted, or something fails.
//!
//! Per (entity, source) the run moves through
//! `Init -> Fetching -> (Normalizing -> Fetching)* -> Done | Failed`.
//! A failure never discards what was already collected: the reviews gathered
//! so far are returned alongside an error [`SourceResult`].

use std::panic::{catch_unwind, AssertUnwindSafe};

use revharvest_core::{ProductMeta, Review, Source, SourceResult};
use tokio_util::sync::CancellationToken;

use crate::adapter::TransportAdapter;
use crate::error::ScraperError;
use crate::normalize::normalize;
use crate::progress::{BatchProgress, HarvestPhase, ProgressEvent, ProgressReporter};
use crate::types::{Cursor, RawRecord};

/// Upper bound on batches per harvest. Guards against adapters whose cursor
/// never ends.
pub const MAX_BATCHES: usize = 500;

/// Output of one (entity, source) harvest.
#[derive(Debug, Clone, PartialEq)]
pub struct Harvest {
    pub reviews: Vec<Review>,
    pub products: Vec<ProductMeta>,
    pub result: SourceResult,
    pub phase: HarvestPhase,
}

/// Calls the reporter, containing any panic it raises.
pub(crate) fn report_safely<R: ProgressReporter + ?Sized>(reporter: &R, event: &ProgressEvent) {
    if catch_unwind(AssertUnwindSafe(|| reporter.report(event))).is_err() {
        tracing::warn!("progress reporter panicked; continuing");
    }
}

/// Runs `adapter` until `target_count` reviews are collected or the source
/// is exhausted.
///
/// Never returns an error: transport failures, cancellation and the batch
/// safety limit end the run in [`HarvestPhase::Failed`] with the partial
/// reviews kept.
pub async fn harvest<A, R>(
    adapter: &mut A,
    company: &str,
    target_count: usize,
    reporter: &R,
    cancel: &CancellationToken,
) -> Harvest
where
    A: TransportAdapter + ?Sized,
    R: ProgressReporter + ?Sized,
{
    let source = adapter.source();
    let mut state = HarvestState::new(source, company, target_count);
    state.emit(reporter);

    let mut cursor: Option<Cursor> = None;

    while state.reviews.len() < target_count {
        if cancel.is_cancelled() {
            return state.fail(reporter, &ScraperError::Cancelled);
        }

        state.batches += 1;
        if state.batches > MAX_BATCHES {
            let err = ScraperError::PaginationLimit {
                company: company.to_string(),
                max_batches: MAX_BATCHES,
            };
            return state.fail(reporter, &err);
        }

        state.phase = HarvestPhase::Fetching;
        let remaining = target_count - state.reviews.len();
        let fetched = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ScraperError::Cancelled),
            batch = adapter.fetch_batch(cursor.as_ref(), remaining) => batch,
        };

        let batch = match fetched {
            Ok(batch) => batch,
            Err(err) => return state.fail(reporter, &err),
        };

        state.phase = HarvestPhase::Normalizing;
        for item in batch.items {
            match item {
                RawRecord::Review(raw) => {
                    if let Some(review) = normalize(&raw, source, company) {
                        state.reviews.push(review);
                    }
                }
                RawRecord::Product(meta) => state.products.push(meta),
            }
        }
        state.reviews.truncate(target_count);
        state.emit(reporter);

        if batch.exhausted || batch.next.is_none() {
            break;
        }
        cursor = batch.next;
    }

    state.finish(reporter)
}

struct HarvestState<'a> {
    source: Source,
    company: &'a str,
    target: usize,
    batches: usize,
    phase: HarvestPhase,
    reviews: Vec<Review>,
    products: Vec<ProductMeta>,
}

impl<'a> HarvestState<'a> {
    fn new(source: Source, company: &'a str, target: usize) -> Self {
        Self {
            source,
            company,
            target,
            batches: 0,
            phase: HarvestPhase::Init,
            reviews: Vec::new(),
            products: Vec::new(),
        }
    }

    fn emit<R: ProgressReporter + ?Sized>(&self, reporter: &R) {
        let event = ProgressEvent::Batch(BatchProgress {
            company: self.company.to_string(),
            source: self.source,
            fetched: self.reviews.len(),
            target: self.target,
            batches: self.batches,
            phase: self.phase,
        });
        report_safely(reporter, &event);
    }

    fn finish<R: ProgressReporter + ?Sized>(mut self, reporter: &R) -> Harvest {
        self.phase = HarvestPhase::Done;
        self.emit(reporter);
        tracing::info!(
            source = %self.source,
            company = %self.company,
            reviews = self.reviews.len(),
            batches = self.batches,
            "harvest finished"
        );
        let result = self.source_result(None);
        Harvest {
            reviews: self.reviews,
            products: self.products,
            result,
            phase: HarvestPhase::Done,
        }
    }

    fn fail<R: ProgressReporter + ?Sized>(mut self, reporter: &R, err: &ScraperError) -> Harvest {
        self.phase = HarvestPhase::Failed;
        self.emit(reporter);
        tracing::warn!(
            source = %self.source,
            company = %self.company,
            reviews = self.reviews.len(),
            batches = self.batches,
            error = %err,
            "harvest failed; keeping partial results"
        );
        let result = self.source_result(Some(err.to_string()));
        Harvest {
            reviews: self.reviews,
            products: self.products,
            result,
            phase: HarvestPhase::Failed,
        }
    }

    fn source_result(&self, error: Option<String>) -> SourceResult {
        let count = self.reviews.len();
        let result = match error {
            None => SourceResult::success(self.source, self.company, count),
            Some(e) => SourceResult::failure(self.source, self.company, count, e),
        };
        if self.source == Source::Ecommerce {
            result.with_products(self.products.len())
        } else {
            result
        }
    }
}

#[cfg(test)]
#[path = "harvest_test.rs"]
mod tests;
