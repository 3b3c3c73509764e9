use revharvest_core::ProductMeta;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

use super::profile::CompiledProfile;
use crate::normalize::coerce_rating;

const MAX_REVIEWS_PER_PRODUCT: usize = 10;
const MIN_REVIEW_CHARS: usize = 10;
const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Everything extracted from one product page.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub meta: ProductMeta,
    pub reviews: Vec<Map<String, Value>>,
}

/// Parses a product page into its metadata and up to ten review snippets.
#[must_use]
pub fn parse_product_page(
    html: &str,
    profile: &CompiledProfile,
    company: &str,
    search_term: &str,
    product_url: &str,
) -> ProductPage {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let product_name = first_text(root, &profile.product_name)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string());
    let price = first_text(root, &profile.product_price).filter(|s| !s.is_empty());
    let rating = first_text(root, &profile.product_rating).filter(|s| !s.is_empty());

    let mut reviews = Vec::new();
    for (i, element) in document
        .select(&profile.review_text)
        .take(MAX_REVIEWS_PER_PRODUCT)
        .enumerate()
    {
        let text = collapse(element);
        if text.chars().count() < MIN_REVIEW_CHARS {
            continue;
        }

        let container = element.parent().and_then(ElementRef::wrap);
        let review_rating = container
            .and_then(|p| first_text(p, &profile.review_rating))
            .and_then(|t| coerce_rating(&Value::String(t)));
        let author = container
            .and_then(|p| first_text(p, &profile.review_author))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("User_{}", i + 1));
        let date = container
            .and_then(|p| first_text(p, &profile.review_date))
            .filter(|s| !s.is_empty());

        let mut record = Map::new();
        record.insert("username".into(), Value::String(author));
        record.insert("review_content".into(), Value::String(text));
        record.insert(
            "rating".into(),
            review_rating.map_or(Value::Null, Value::from),
        );
        if let Some(date) = date {
            record.insert("datetime".into(), Value::String(date));
        }
        record.insert("product_name".into(), Value::String(product_name.clone()));
        record.insert("product_url".into(), Value::String(product_url.to_string()));
        record.insert("search_term".into(), Value::String(search_term.to_string()));
        reviews.push(record);
    }

    let meta = ProductMeta {
        company: company.to_string(),
        search_term: search_term.to_string(),
        product_name,
        product_url: product_url.to_string(),
        price,
        rating,
        reviews_count: u32::try_from(reviews.len()).ok(),
    };

    ProductPage { meta, reviews }
}

fn first_text(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector).next().map(collapse)
}

fn collapse(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::super::profile::{CompiledProfile, GENERIC};
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <h1>Oak Desk</h1>
  <span class="price">$199.00</span>
  <div class="rating">4.2 out of 5</div>
  <div class="reviews">
    <div class="review">
      <span class="review-author">Morgan</span>
      <span class="review-stars">5 stars</span>
      <span class="review-date">2024-05-01</span>
      <p class="review-text">Solid build and quick assembly.</p>
    </div>
    <div class="review">
      <p class="review-text">Too short</p>
    </div>
    <div class="review">
      <p class="review-text">Scratched on arrival, support replaced it.</p>
    </div>
  </div>
</body></html>
"#;

    #[test]
    fn extracts_meta_and_reviews() {
        let profile = CompiledProfile::compile(&GENERIC).unwrap();
        let page = parse_product_page(PAGE, &profile, "Shop", "home", "https://s.test/product/1");

        assert_eq!(page.meta.product_name, "Oak Desk");
        assert_eq!(page.meta.price.as_deref(), Some("$199.00"));
        assert_eq!(page.meta.rating.as_deref(), Some("4.2 out of 5"));
        assert_eq!(page.meta.reviews_count, Some(2));

        assert_eq!(page.reviews.len(), 2);
        let first = &page.reviews[0];
        assert_eq!(first["username"], "Morgan");
        assert_eq!(first["rating"], 5.0);
        assert_eq!(first["datetime"], "2024-05-01");
        assert_eq!(first["product_name"], "Oak Desk");

        let second = &page.reviews[1];
        assert_eq!(second["username"], "User_3");
        assert_eq!(second["rating"], Value::Null);
        assert!(second.get("datetime").is_none());
    }

    #[test]
    fn missing_name_uses_placeholder() {
        let profile = CompiledProfile::compile(&GENERIC).unwrap();
        let page = parse_product_page("<p>nothing</p>", &profile, "Shop", "home", "u");
        assert_eq!(page.meta.product_name, "Unknown Product");
        assert!(page.reviews.is_empty());
        assert_eq!(page.meta.reviews_count, Some(0));
    }
}
