//! Search-and-crawl adapter for shop sites.
//!
//! Discovery runs once, on the first batch: up to three search terms are
//! queried and the product links found are queued. Each later batch visits
//! one product page and yields its [`ProductMeta`](revharvest_core::ProductMeta)
//! plus any review snippets on it.

pub mod discover;
pub mod product;
pub mod profile;

use std::collections::HashSet;

use reqwest::{Client, Url};
use revharvest_core::Source;

use crate::adapter::http::fetch_html;
use crate::adapter::TransportAdapter;
use crate::error::ScraperError;
use crate::rate_limit::RateController;
use crate::retry::RetryPolicy;
use crate::types::{Batch, Cursor, RawRecord};

use self::discover::{extract_product_links, search_url};
use self::product::parse_product_page;
use self::profile::{CompiledProfile, SiteProfile};

const MAX_SEARCH_TERMS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueuedProduct {
    url: String,
    search_term: String,
}

pub struct EcommerceAdapter {
    client: Client,
    rate: RateController,
    retry: RetryPolicy,
    base_url: Url,
    profile: CompiledProfile,
    company: String,
    search_terms: Vec<String>,
    max_products: usize,
    queue: Option<Vec<QueuedProduct>>,
}

impl EcommerceAdapter {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `base_url` does not parse, or
    /// [`ScraperError::Selector`] if the detected profile fails to compile.
    pub fn new(
        client: Client,
        rate: RateController,
        retry: RetryPolicy,
        base_url: &str,
        company: &str,
        search_terms: &[String],
        max_products: usize,
    ) -> Result<Self, ScraperError> {
        let base = Url::parse(base_url.trim()).map_err(|e| ScraperError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let site = SiteProfile::detect(&base);
        let profile = CompiledProfile::compile(site)?;

        let terms: Vec<String> = if search_terms.iter().any(|t| !t.trim().is_empty()) {
            search_terms
                .iter()
                .filter(|t| !t.trim().is_empty())
                .take(MAX_SEARCH_TERMS)
                .cloned()
                .collect()
        } else {
            site.default_terms
                .iter()
                .take(MAX_SEARCH_TERMS)
                .map(|t| (*t).to_string())
                .collect()
        };

        tracing::debug!(site = site.name, base_url = %base, "selected site profile");

        Ok(Self {
            client,
            rate,
            retry,
            base_url: base,
            profile,
            company: company.to_string(),
            search_terms: terms,
            max_products,
            queue: None,
        })
    }

    /// Name of the site profile picked for this shop.
    #[must_use]
    pub fn site_name(&self) -> &'static str {
        self.profile.profile.name
    }

    /// Queries each search term and queues product URLs, deduplicated, up to
    /// `max_products`. A failing search is logged and the next term tried.
    async fn discover(&self) -> Vec<QueuedProduct> {
        let mut visited = HashSet::new();
        let mut queue = Vec::new();
        let per_term = (self.max_products / self.search_terms.len().max(1)).max(1);

        for term in &self.search_terms {
            if queue.len() >= self.max_products {
                break;
            }
            let url = search_url(&self.base_url, self.profile.profile.search_path, term);
            tracing::info!(term = %term, url = %url, "searching for products");

            let html = match fetch_html(&self.client, &self.rate, self.retry, &url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(
                        term = %term,
                        error = %e,
                        "product search failed, trying next term"
                    );
                    continue;
                }
            };

            let budget = per_term.min(self.max_products - queue.len());
            let links =
                extract_product_links(&html, &self.profile, &self.base_url, budget, &mut visited);
            queue.extend(links.into_iter().map(|url| QueuedProduct {
                url,
                search_term: term.clone(),
            }));
        }

        tracing::info!(
            company = %self.company,
            products = queue.len(),
            "product discovery finished"
        );
        queue
    }
}

impl TransportAdapter for EcommerceAdapter {
    fn source(&self) -> Source {
        Source::Ecommerce
    }

    async fn fetch_batch(
        &mut self,
        cursor: Option<&Cursor>,
        _size: usize,
    ) -> Result<Batch, ScraperError> {
        if self.queue.is_none() {
            let found = self.discover().await;
            self.queue = Some(found);
        }
        let queue = self.queue.as_deref().unwrap_or_default();

        let index = match cursor {
            Some(Cursor::Page(n)) => usize::try_from(*n).unwrap_or(usize::MAX),
            _ => 0,
        };
        let Some(item) = queue.get(index) else {
            return Ok(Batch::exhausted());
        };

        let items = match fetch_html(&self.client, &self.rate, self.retry, &item.url).await {
            Ok(html) => {
                let page = parse_product_page(
                    &html,
                    &self.profile,
                    &self.company,
                    &item.search_term,
                    &item.url,
                );
                tracing::info!(
                    product = index + 1,
                    total = queue.len(),
                    reviews = page.reviews.len(),
                    "scraped product page"
                );
                std::iter::once(RawRecord::Product(page.meta))
                    .chain(page.reviews.into_iter().map(RawRecord::Review))
                    .collect()
            }
            Err(e) => {
                tracing::warn!(url = %item.url, error = %e, "product page failed, skipping");
                Vec::new()
            }
        };

        let next_index = index + 1;
        let exhausted = next_index >= queue.len();
        Ok(Batch {
            items,
            next: (!exhausted)
                .then(|| u32::try_from(next_index).ok().map(Cursor::Page))
                .flatten(),
            exhausted,
        })
    }
}
