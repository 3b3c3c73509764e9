//! Transport adapters: one per source kind, all behind [`TransportAdapter`].

pub mod aggregator;
pub mod app_store;
pub mod ecommerce;
pub(crate) mod http;

use std::future::Future;

use revharvest_core::{AppConfig, Source, SourceTarget};

use crate::error::ScraperError;
use crate::play_store::PlayStoreClient;
use crate::rate_limit::{RateController, RatePolicy};
use crate::retry::RetryPolicy;
use crate::types::{Batch, Cursor};

pub use aggregator::AggregatorAdapter;
pub use app_store::AppStoreAdapter;
pub use ecommerce::EcommerceAdapter;

/// Fetches one batch of raw records per call.
///
/// `cursor` is `None` on the first call and the previous batch's `next`
/// afterwards. `size` is the number of reviews still wanted; adapters may
/// return fewer or more.
pub trait TransportAdapter: Send {
    fn source(&self) -> Source;

    fn fetch_batch(
        &mut self,
        cursor: Option<&Cursor>,
        size: usize,
    ) -> impl Future<Output = Result<Batch, ScraperError>> + Send;
}

/// Any of the HTTP-backed adapters.
pub enum SourceAdapter {
    AppStore(AppStoreAdapter),
    Aggregator(AggregatorAdapter),
    Ecommerce(EcommerceAdapter),
}

impl TransportAdapter for SourceAdapter {
    fn source(&self) -> Source {
        match self {
            SourceAdapter::AppStore(a) => a.source(),
            SourceAdapter::Aggregator(a) => a.source(),
            SourceAdapter::Ecommerce(a) => a.source(),
        }
    }

    async fn fetch_batch(
        &mut self,
        cursor: Option<&Cursor>,
        size: usize,
    ) -> Result<Batch, ScraperError> {
        match self {
            SourceAdapter::AppStore(a) => a.fetch_batch(cursor, size).await,
            SourceAdapter::Aggregator(a) => a.fetch_batch(cursor, size).await,
            SourceAdapter::Ecommerce(a) => a.fetch_batch(cursor, size).await,
        }
    }
}

/// Builds a fresh adapter for one (entity, source) pair.
pub trait AdapterFactory {
    type Adapter: TransportAdapter;

    /// # Errors
    ///
    /// Returns a [`ScraperError`] if the adapter cannot be constructed, e.g.
    /// an unparsable URL or an HTTP client build failure.
    fn build(&self, company: &str, target: &SourceTarget) -> Result<Self::Adapter, ScraperError>;
}

/// Production factory: every adapter gets its own HTTP session.
#[derive(Debug, Clone)]
pub struct HttpAdapterFactory {
    pub timeout_secs: u64,
    pub rate: RatePolicy,
    pub retry: RetryPolicy,
    /// Overrides the Play Store host. Used by tests.
    pub play_store_base_url: Option<String>,
}

impl HttpAdapterFactory {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.request_timeout_secs,
            rate: RatePolicy::from_config(config),
            retry: RetryPolicy::from_config(config),
            play_store_base_url: None,
        }
    }
}

impl AdapterFactory for HttpAdapterFactory {
    type Adapter = SourceAdapter;

    fn build(&self, company: &str, target: &SourceTarget) -> Result<SourceAdapter, ScraperError> {
        let rate = RateController::new(self.rate);
        match target {
            SourceTarget::AppStore {
                app_id,
                language,
                country,
                sort,
                ..
            } => {
                let client = match &self.play_store_base_url {
                    Some(base) => {
                        PlayStoreClient::with_base_url(base, self.timeout_secs, self.retry)?
                    }
                    None => PlayStoreClient::new(self.timeout_secs, self.retry)?,
                };
                Ok(SourceAdapter::AppStore(AppStoreAdapter::new(
                    client, rate, app_id, language, country, *sort,
                )))
            }
            SourceTarget::ReviewAggregator { url, .. } => {
                let client = http::build_browser_client(self.timeout_secs)?;
                Ok(SourceAdapter::Aggregator(AggregatorAdapter::new(
                    client, rate, self.retry, url,
                )))
            }
            SourceTarget::Ecommerce {
                url,
                search_terms,
                max_products,
                ..
            } => {
                let client = http::build_browser_client(self.timeout_secs)?;
                Ok(SourceAdapter::Ecommerce(EcommerceAdapter::new(
                    client,
                    rate,
                    self.retry,
                    url,
                    company,
                    search_terms,
                    *max_products,
                )?))
            }
        }
    }
}
