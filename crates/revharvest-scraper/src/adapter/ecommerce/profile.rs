use scraper::Selector;

use crate::error::ScraperError;

/// CSS selectors and search path for one family of shop sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteProfile {
    pub name: &'static str,
    pub product_links: &'static str,
    pub product_name: &'static str,
    pub product_price: &'static str,
    pub product_rating: &'static str,
    pub review_text: &'static str,
    pub review_rating: &'static str,
    pub review_author: &'static str,
    pub review_date: &'static str,
    pub search_path: &'static str,
    pub default_terms: &'static [&'static str],
}

pub const TARGET: SiteProfile = SiteProfile {
    name: "target",
    product_links: r#"a[data-test="product-title"]"#,
    product_name: r#"[data-test="product-title"]"#,
    product_price: r#"[data-test="product-price"]"#,
    product_rating: r#"[data-test="ratings-and-reviews"]"#,
    review_text: r#"[data-test="review-content"]"#,
    review_rating: r#"[data-test="review-rating"]"#,
    review_author: r#"[data-test="review-author"]"#,
    review_date: r#"[data-test="review-date"]"#,
    search_path: "/s/",
    default_terms: &["electronics", "home", "kitchen", "furniture", "clothing"],
};

pub const AMAZON: SiteProfile = SiteProfile {
    name: "amazon",
    product_links: r#"a[class*="s-link-style"]"#,
    product_name: "h2 a span",
    product_price: ".a-price-whole",
    product_rating: ".a-icon-alt",
    review_text: r#"[data-hook="review-body"] span"#,
    review_rating: ".a-icon-alt",
    review_author: ".a-profile-name",
    review_date: r#"[data-hook="review-date"]"#,
    search_path: "/s?k=",
    default_terms: &["electronics", "home", "kitchen", "books", "clothing"],
};

pub const GENERIC: SiteProfile = SiteProfile {
    name: "generic",
    product_links: r#"a[href*="/product"], a[href*="/item"], a[class*="product"]"#,
    product_name: "h1, h2, h3, .product-name, .item-name, .title",
    product_price: r#".price, .cost, .amount, [class*="price"]"#,
    product_rating: r#".rating, .stars, [class*="rating"]"#,
    review_text: ".review-text, .review-content, .comment",
    review_rating: ".review-rating, .review-stars",
    review_author: ".review-author, .reviewer-name, .author",
    review_date: ".review-date, .date",
    search_path: "/search?q=",
    default_terms: &["electronics", "home", "kitchen", "clothing", "books"],
};

impl SiteProfile {
    /// Picks a profile by sniffing the host name of `base_url`.
    #[must_use]
    pub fn detect(base_url: &reqwest::Url) -> &'static SiteProfile {
        let host = base_url.host_str().unwrap_or_default().to_ascii_lowercase();
        if host.contains("target.com") {
            &TARGET
        } else if host.contains("amazon.com") {
            &AMAZON
        } else {
            &GENERIC
        }
    }
}

/// A [`SiteProfile`] with its selectors parsed.
#[derive(Debug)]
pub struct CompiledProfile {
    pub profile: &'static SiteProfile,
    pub product_links: Selector,
    pub product_name: Selector,
    pub product_price: Selector,
    pub product_rating: Selector,
    pub review_text: Selector,
    pub review_rating: Selector,
    pub review_author: Selector,
    pub review_date: Selector,
}

impl CompiledProfile {
    /// # Errors
    ///
    /// Returns [`ScraperError::Selector`] if any selector fails to parse.
    pub fn compile(profile: &'static SiteProfile) -> Result<Self, ScraperError> {
        Ok(Self {
            profile,
            product_links: parse(profile.product_links)?,
            product_name: parse(profile.product_name)?,
            product_price: parse(profile.product_price)?,
            product_rating: parse(profile.product_rating)?,
            review_text: parse(profile.review_text)?,
            review_rating: parse(profile.review_rating)?,
            review_author: parse(profile.review_author)?,
            review_date: parse(profile.review_date)?,
        })
    }
}

fn parse(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}
