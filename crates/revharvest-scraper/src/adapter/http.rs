use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::{Client, Response, StatusCode};

use crate::error::ScraperError;
use crate::rate_limit::RateController;
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Builds a client that sends browser-like navigation headers by default.
pub(crate) fn build_browser_client(timeout_secs: u64) -> Result<Client, ScraperError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));

    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Maps non-2xx responses to typed errors.
pub(crate) fn check_status(response: &Response, url: &str) -> Result<(), ScraperError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(ScraperError::RateLimited {
            domain: extract_domain(url),
            retry_after_secs,
        });
    }

    if status == StatusCode::NOT_FOUND {
        return Err(ScraperError::NotFound {
            url: url.to_string(),
        });
    }

    if !status.is_success() {
        return Err(ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    Ok(())
}

/// GETs an HTML page. Every attempt waits on the rate controller first and
/// carries a fresh user-agent.
pub(crate) async fn fetch_html(
    client: &Client,
    rate: &RateController,
    retry: RetryPolicy,
    url: &str,
) -> Result<String, ScraperError> {
    retry_with_backoff(retry, || async move {
        rate.wait().await;
        let response = client
            .get(url)
            .header(reqwest::header::USER_AGENT, rate.next_identity())
            .send()
            .await?;
        check_status(&response, url)?;
        Ok(response.text().await?)
    })
    .await
}

/// Extracts the host from a URL for error messages, falling back to the input.
pub(crate) fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_domain_returns_host() {
        assert_eq!(
            extract_domain("https://www.trustpilot.com/review/acme.com?page=2"),
            "www.trustpilot.com"
        );
    }

    #[test]
    fn extract_domain_falls_back_to_input() {
        assert_eq!(extract_domain("not a url"), "not a url");
    }
}
