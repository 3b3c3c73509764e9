use std::collections::HashSet;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Url;
use scraper::Html;

use super::profile::CompiledProfile;

/// Search page URL for one term.
#[must_use]
pub fn search_url(base_url: &Url, search_path: &str, term: &str) -> String {
    format!(
        "{}{}{}",
        base_url.as_str().trim_end_matches('/'),
        search_path,
        utf8_percent_encode(term.trim(), NON_ALPHANUMERIC)
    )
}

/// Resolves an `href` found on a search page to an absolute URL.
///
/// Fragment-only and `javascript:` links are ignored.
#[must_use]
pub fn resolve_href(base_url: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Url::parse(href).ok();
    }
    if href.starts_with('/') {
        return base_url.join(href).ok();
    }
    base_url.join(&format!("/{href}")).ok()
}

/// Collects up to `limit` product URLs from a search page that are not yet in
/// `visited`. Newly found URLs are added to `visited`.
pub fn extract_product_links(
    html: &str,
    profile: &CompiledProfile,
    base_url: &Url,
    limit: usize,
    visited: &mut HashSet<String>,
) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut found = Vec::new();
    for link in document.select(&profile.product_links) {
        if found.len() >= limit {
            break;
        }
        let Some(url) = link
            .value()
            .attr("href")
            .and_then(|href| resolve_href(base_url, href))
        else {
            continue;
        };
        let url = url.to_string();
        if visited.insert(url.clone()) {
            found.push(url);
        }
    }
    found
}
