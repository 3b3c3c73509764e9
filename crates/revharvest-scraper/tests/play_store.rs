//! Integration tests for the Play Store client and the app-store adapter.
//!
//! A local `wiremock` server stands in for `play.google.com`; no real network
//! traffic is made.

use revharvest_core::{AppStoreSort, Source, SourceStatus, SourceTarget};
use revharvest_scraper::play_store::{PlayStoreClient, ReviewQuery};
use revharvest_scraper::{
    harvest, AdapterFactory, HttpAdapterFactory, RateController, RatePolicy, RetryPolicy,
    ScraperError, SilentReporter,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RPC_PATH: &str = "/_/PlayStoreUi/data/batchexecute";

fn review_item(n: usize) -> Value {
    json!([
        format!("gp:{n}"),
        [format!("user{n}"), [null, null, null, [null, null, "https://img.test/a.png"]]],
        (n % 5) + 1,
        null,
        format!("Review text number {n}"),
        [1_700_000_000 + n, 0],
        n,
        [null, "Thanks!", [1_700_000_100]],
        null,
        null,
        "2.0.1"
    ])
}

fn rpc_body(range: std::ops::Range<usize>, token: Option<&str>) -> String {
    let payload = json!([
        range.map(review_item).collect::<Vec<_>>(),
        token.map_or(Value::Null, |t| json!([null, t]))
    ]);
    let envelope = json!([["wrb.fr", "UsvDTd", payload.to_string(), null, null, null, "generic"]]);
    format!(")]}}'\n\n{envelope}")
}

fn factory(base: &str, retry: RetryPolicy) -> HttpAdapterFactory {
    HttpAdapterFactory {
        timeout_secs: 5,
        rate: RatePolicy::none(),
        retry,
        play_store_base_url: Some(base.to_string()),
    }
}

fn target(n: usize) -> SourceTarget {
    SourceTarget::AppStore {
        app_id: "com.acme.bank".to_string(),
        target: n,
        language: "en".to_string(),
        country: "us".to_string(),
        sort: AppStoreSort::Newest,
    }
}

#[tokio::test]
async fn client_sends_locale_and_app_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(query_param("hl", "en"))
        .and(query_param("gl", "us"))
        .and(body_string_contains("UsvDTd"))
        .and(body_string_contains("bank"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rpc_body(0..2, Some("next"))))
        .expect(1)
        .mount(&server)
        .await;

    let client = PlayStoreClient::with_base_url(&server.uri(), 5, RetryPolicy::none()).unwrap();
    let rate = RateController::new(RatePolicy::none());
    let page = client
        .fetch_reviews(
            ReviewQuery {
                app_id: "com.acme.bank",
                language: "en",
                country: "us",
                sort: 2,
                count: 20,
                token: None,
            },
            &rate,
        )
        .await
        .unwrap();

    assert_eq!(page.reviews.len(), 2);
    assert_eq!(page.next_token.as_deref(), Some("next"));
    assert_eq!(page.reviews[0]["replyContent"], "Thanks!");
}

#[tokio::test]
async fn client_maps_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = PlayStoreClient::with_base_url(&server.uri(), 5, RetryPolicy::none()).unwrap();
    let rate = RateController::new(RatePolicy::none());
    let result = client
        .fetch_reviews(
            ReviewQuery {
                app_id: "com.missing",
                language: "en",
                country: "us",
                sort: 2,
                count: 20,
                token: None,
            },
            &rate,
        )
        .await;

    assert!(
        matches!(result, Err(ScraperError::NotFound { .. })),
        "expected NotFound, got: {result:?}"
    );
}

#[tokio::test]
async fn harvest_follows_continuation_tokens_and_strips_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_string_contains("page2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rpc_body(20..35, None)))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(rpc_body(0..20, Some("page2"))))
        .expect(1)
        .mount(&server)
        .await;

    let mut adapter = factory(&server.uri(), RetryPolicy::none())
        .build("Acme Bank", &target(30))
        .unwrap();
    let out = harvest(
        &mut adapter,
        "Acme Bank",
        30,
        &SilentReporter,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(out.result.status, SourceStatus::Success);
    assert_eq!(out.reviews.len(), 30);
    let first = &out.reviews[0];
    assert_eq!(first.source, Source::AppStore);
    assert_eq!(first.company, "Acme Bank");
    assert_eq!(first.username, "user0");
    assert_eq!(first.rating, Some(1.0));
    assert!(first.datetime.as_datetime().is_some());
    for stripped in ["userImage", "replyContent", "repliedAt", "appVersion"] {
        assert!(!first.extra.contains_key(stripped), "{stripped} should be stripped");
    }
    assert!(first.extra.contains_key("reviewId"));
}

#[tokio::test]
async fn harvest_reports_error_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut adapter = factory(&server.uri(), RetryPolicy::new(3, 0))
        .build("Acme Bank", &target(10))
        .unwrap();
    let out = harvest(
        &mut adapter,
        "Acme Bank",
        10,
        &SilentReporter,
        &CancellationToken::new(),
    )
    .await;

    assert!(out.reviews.is_empty());
    assert_eq!(out.result.status, SourceStatus::Error);
    assert!(out.result.error.unwrap().contains("503"));
}
