//! Numbered-page HTML adapter for Trustpilot company review pages.

use std::sync::LazyLock;

use reqwest::Client;
use revharvest_core::Source;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::adapter::http::fetch_html;
use crate::adapter::TransportAdapter;
use crate::error::ScraperError;
use crate::rate_limit::RateController;
use crate::retry::RetryPolicy;
use crate::types::{Batch, Cursor, RawRecord};

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static CSS selector is valid")
}

static CARD: LazyLock<Selector> = LazyLock::new(|| sel("article[data-service-review-card-paper]"));
static CARD_FALLBACK: LazyLock<Selector> = LazyLock::new(|| sel("div.review"));
static RATING: LazyLock<Selector> = LazyLock::new(|| sel("div[data-service-review-rating]"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| sel("h2[data-service-review-title-typography]"));
static CONTENT: LazyLock<[Selector; 3]> = LazyLock::new(|| {
    [
        sel("div[data-service-review-content-typography]"),
        sel("div[data-service-review-expanded-content-typography]"),
        sel("div[data-service-review-text-typography]"),
    ]
});
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| sel("p"));
static TIME: LazyLock<Selector> = LazyLock::new(|| sel("time"));
static REVIEWER: LazyLock<Selector> =
    LazyLock::new(|| sel("span[data-consumer-name-typography]"));
static VERIFIED: LazyLock<Selector> = LazyLock::new(|| sel("div[data-verification-label]"));
static LOCATION: LazyLock<Selector> =
    LazyLock::new(|| sel("div[data-consumer-country-typography]"));

pub struct AggregatorAdapter {
    client: Client,
    rate: RateController,
    retry: RetryPolicy,
    company_url: String,
}

impl AggregatorAdapter {
    #[must_use]
    pub fn new(
        client: Client,
        rate: RateController,
        retry: RetryPolicy,
        company_url: &str,
    ) -> Self {
        Self {
            client,
            rate,
            retry,
            company_url: company_url.trim().to_string(),
        }
    }
}

impl TransportAdapter for AggregatorAdapter {
    fn source(&self) -> Source {
        Source::ReviewAggregator
    }

    async fn fetch_batch(
        &mut self,
        cursor: Option<&Cursor>,
        _size: usize,
    ) -> Result<Batch, ScraperError> {
        let page = match cursor {
            Some(Cursor::Page(n)) => *n,
            _ => 1,
        };
        let url = page_url(&self.company_url, page);
        tracing::info!(page, url = %url, "fetching review page");

        let html = fetch_html(&self.client, &self.rate, self.retry, &url).await?;
        let reviews = parse_review_cards(&html);
        tracing::info!(page, count = reviews.len(), "parsed review page");

        if reviews.is_empty() {
            return Ok(Batch::exhausted());
        }

        Ok(Batch {
            items: reviews.into_iter().map(RawRecord::Review).collect(),
            next: Some(Cursor::Page(page + 1)),
            exhausted: false,
        })
    }
}

/// URL of page `page`. Page 1 is the bare company URL.
#[must_use]
pub fn page_url(company_url: &str, page: u32) -> String {
    if page <= 1 {
        company_url.to_string()
    } else if company_url.contains('?') {
        format!("{company_url}&page={page}")
    } else {
        format!("{company_url}?page={page}")
    }
}

/// Extracts one raw record per review card on the page.
#[must_use]
pub fn parse_review_cards(html: &str) -> Vec<Map<String, Value>> {
    let document = Html::parse_document(html);
    let mut cards: Vec<ElementRef<'_>> = document.select(&CARD).collect();
    if cards.is_empty() {
        cards = document.select(&CARD_FALLBACK).collect();
    }
    cards.into_iter().map(parse_card).collect()
}

fn parse_card(card: ElementRef<'_>) -> Map<String, Value> {
    let rating = card
        .select(&RATING)
        .next()
        .and_then(|el| el.value().attr("data-service-review-rating"))
        .and_then(|r| r.trim().parse::<u8>().ok());

    let title = first_text(card, &TITLE).unwrap_or_default();

    let content = CONTENT
        .iter()
        .find_map(|selector| first_text(card, selector))
        .or_else(|| first_text(card, &PARAGRAPH))
        .unwrap_or_default();

    let date = card
        .select(&TIME)
        .next()
        .and_then(|el| el.value().attr("datetime"))
        .unwrap_or_default()
        .to_string();

    let reviewer = first_text(card, &REVIEWER).unwrap_or_default();
    let verified = card.select(&VERIFIED).next().is_some();
    let location = first_text(card, &LOCATION).unwrap_or_default();

    let review_id = if !reviewer.is_empty() && !date.is_empty() {
        format!("{reviewer}_{date}").replace(' ', "_")
    } else {
        let prefix: String = content.chars().take(100).collect();
        let digest = Sha256::digest(prefix.as_bytes());
        let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
        format!("review_{hex}")
    };

    let mut out = Map::new();
    out.insert("review_id".into(), Value::String(review_id));
    out.insert("rating".into(), rating.map_or(Value::Null, Value::from));
    out.insert("title".into(), Value::String(title));
    out.insert("content".into(), Value::String(content));
    out.insert("date".into(), Value::String(date));
    out.insert("reviewer".into(), Value::String(reviewer));
    out.insert("verified".into(), Value::Bool(verified));
    out.insert("location".into(), Value::String(location));
    out
}

fn first_text(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector).next().map(|el| {
        el.text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <article data-service-review-card-paper="true">
    <span data-consumer-name-typography="true">Jane Doe</span>
    <div data-consumer-country-typography="true">GB</div>
    <div data-service-review-rating="4"></div>
    <time datetime="2024-02-03T10:00:00.000Z">Feb 3, 2024</time>
    <div data-verification-label="true">Verified</div>
    <h2 data-service-review-title-typography="true">Quick delivery</h2>
    <div data-service-review-content-typography="true">Arrived in two days,
      well packed.</div>
  </article>
  <article data-service-review-card-paper="true">
    <div data-service-review-rating="1"></div>
    <p>Never again.</p>
  </article>
</body></html>
"#;

    #[test]
    fn page_url_appends_page_parameter() {
        let base = "https://www.trustpilot.com/review/acme.com";
        assert_eq!(page_url(base, 1), base);
        assert_eq!(page_url(base, 3), format!("{base}?page=3"));
        assert_eq!(
            page_url("https://x.test/review/a?languages=all", 2),
            "https://x.test/review/a?languages=all&page=2"
        );
    }

    #[test]
    fn parses_every_card_field() {
        let reviews = parse_review_cards(PAGE);
        assert_eq!(reviews.len(), 2);

        let first = &reviews[0];
        assert_eq!(first["reviewer"], "Jane Doe");
        assert_eq!(first["rating"], 4);
        assert_eq!(first["title"], "Quick delivery");
        assert_eq!(first["content"], "Arrived in two days, well packed.");
        assert_eq!(first["date"], "2024-02-03T10:00:00.000Z");
        assert_eq!(first["verified"], true);
        assert_eq!(first["location"], "GB");
        assert_eq!(first["review_id"], "Jane_Doe_2024-02-03T10:00:00.000Z");
    }

    #[test]
    fn missing_fields_degrade_independently() {
        let reviews = parse_review_cards(PAGE);
        let second = &reviews[1];
        assert_eq!(second["rating"], 1);
        assert_eq!(second["content"], "Never again.");
        assert_eq!(second["reviewer"], "");
        assert_eq!(second["verified"], false);
        assert!(second["review_id"].as_str().unwrap().starts_with("review_"));
    }

    #[test]
    fn falls_back_to_generic_review_divs() {
        let html = r#"<div class="review"><p>Legacy markup works.</p></div>"#;
        let reviews = parse_review_cards(html);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0]["content"], "Legacy markup works.");
    }

    #[test]
    fn page_without_cards_yields_nothing() {
        assert!(parse_review_cards("<html><body><p>No reviews</p></body></html>").is_empty());
    }
}
