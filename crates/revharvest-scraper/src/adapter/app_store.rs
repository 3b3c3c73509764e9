use rand::Rng;
use revharvest_core::{AppStoreSort, Source};

use crate::adapter::TransportAdapter;
use crate::error::ScraperError;
use crate::play_store::{PlayStoreClient, ReviewQuery};
use crate::rate_limit::RateController;
use crate::types::{Batch, Cursor, RawRecord};

/// Upstream fields dropped before normalization.
const STRIPPED_FIELDS: &[&str] = &["userImage", "replyContent", "repliedAt", "appVersion"];

const MAX_FIRST_BATCH: usize = 50;
const MIN_FIRST_BATCH: usize = 20;
const LATER_BATCH: std::ops::RangeInclusive<usize> = 40..=60;

/// Cursor-paginated adapter over the Play Store review client.
pub struct AppStoreAdapter {
    client: PlayStoreClient,
    rate: RateController,
    app_id: String,
    language: String,
    country: String,
    sort: AppStoreSort,
    first_batch: bool,
}

impl AppStoreAdapter {
    #[must_use]
    pub fn new(
        client: PlayStoreClient,
        rate: RateController,
        app_id: &str,
        language: &str,
        country: &str,
        sort: AppStoreSort,
    ) -> Self {
        Self {
            client,
            rate,
            app_id: app_id.to_string(),
            language: language.to_string(),
            country: country.to_string(),
            sort,
            first_batch: true,
        }
    }

    /// Picks the size of the next request. The first batch is drawn from
    /// `[min(20, cap), cap]` with `cap = min(50, remaining)`; later batches
    /// from `[40, 60]` capped at `remaining`.
    fn next_batch_size(&mut self, remaining: usize) -> usize {
        let mut rng = rand::rng();
        if std::mem::replace(&mut self.first_batch, false) {
            let cap = MAX_FIRST_BATCH.min(remaining);
            rng.random_range(MIN_FIRST_BATCH.min(cap)..=cap)
        } else {
            rng.random_range(LATER_BATCH).min(remaining)
        }
    }
}

impl TransportAdapter for AppStoreAdapter {
    fn source(&self) -> Source {
        Source::AppStore
    }

    async fn fetch_batch(
        &mut self,
        cursor: Option<&Cursor>,
        size: usize,
    ) -> Result<Batch, ScraperError> {
        let count = self.next_batch_size(size);
        let token = match cursor {
            Some(Cursor::Token(t)) => Some(t.as_str()),
            _ => None,
        };

        tracing::debug!(
            app_id = %self.app_id,
            count,
            has_token = token.is_some(),
            "fetching app store batch"
        );

        let page = self
            .client
            .fetch_reviews(
                ReviewQuery {
                    app_id: &self.app_id,
                    language: &self.language,
                    country: &self.country,
                    sort: self.sort.code(),
                    count,
                    token,
                },
                &self.rate,
            )
            .await?;

        let exhausted = page.next_token.is_none() || page.reviews.is_empty();
        let items = page
            .reviews
            .into_iter()
            .map(|mut review| {
                for field in STRIPPED_FIELDS {
                    review.remove(*field);
                }
                RawRecord::Review(review)
            })
            .collect();

        Ok(Batch {
            items,
            next: page.next_token.map(Cursor::Token),
            exhausted,
        })
    }
}
