#![allow(clippy::unwrap_used)]
// Integration tests for `Catalog` and the category cache over HTTP.

use std::sync::Arc;
use std::time::Duration;

use catalog_api::RetryPolicy;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use catalog_core::{
    CacheState, Catalog, ClientConfig, CoreError, Role, StaticTokenProvider, TokenProvider, User,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(tokens: Option<Arc<dyn TokenProvider>>) -> (MockServer, Catalog) {
    let server = MockServer::start().await;
    let mut config = ClientConfig::new(Url::parse(&format!("{}/api", server.uri())).unwrap());
    config.retry = RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(10),
    };
    config.cache_retry_delay = Duration::from_millis(200);
    let catalog = Catalog::new(config, tokens).unwrap();
    (server, catalog)
}

fn token() -> Option<Arc<dyn TokenProvider>> {
    Some(Arc::new(StaticTokenProvider::new(Some(
        "t0k3n".to_string().into(),
    ))))
}

fn category(name: &str, slug: &str) -> serde_json::Value {
    json!({
        "id": 0,
        "name": name,
        "slug": slug,
        "itemCount": 0,
        "summary": "",
        "description": ""
    })
}

fn instrument(id: i64, owner: &str) -> serde_json::Value {
    json!({
        "id": id,
        "categoryId": 0,
        "userId": owner,
        "name": "Flute",
        "summary": "",
        "description": "",
        "imageUrl": ""
    })
}

fn user(sub: &str, roles: Vec<Role>) -> User {
    User {
        name: "Regular Joe".into(),
        sub: sub.into(),
        roles,
    }
}

// ── Category cache ──────────────────────────────────────────────────

#[tokio::test]
async fn test_category_cache_fetches_once_for_concurrent_subscribers() {
    let (server, catalog) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "categories": [category("Winds", "winds")] }))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut first = catalog.categories().subscribe();
    let mut second = catalog.categories().subscribe();

    let a = first.changed().await.unwrap();
    let b = second.changed().await.unwrap();
    assert_eq!(a.data, b.data);
    assert_eq!(a.data[0].slug, "winds");

    let loaded = catalog.categories().load().await.unwrap();
    assert_eq!(loaded.len(), 1);
}

#[tokio::test]
async fn test_category_cache_recovers_after_server_error() {
    let (server, catalog) = setup(None).await;

    // Four attempts (one plus three retries) exhaust the executor's budget.
    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(4)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "categories": [category("Brass", "brass")] })),
        )
        .mount(&server)
        .await;

    let mut sub = catalog.categories().subscribe();
    let failed = sub.changed().await.unwrap();
    assert_eq!(
        failed.error_message.as_deref(),
        Some("Error from server: \"500 Internal Server Error\". Please send a bug report!")
    );
    assert_eq!(
        catalog.categories().state(),
        CacheState::Error { recoverable: true }
    );

    let recovered = sub.changed().await.unwrap();
    assert!(recovered.has_loaded);
    assert_eq!(recovered.error_message, None);
    assert_eq!(recovered.data[0].name, "Brass");
}

#[tokio::test]
async fn test_category_cache_gives_up_on_not_found() {
    let (server, catalog) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "BAD" })))
        .mount(&server)
        .await;

    let err = catalog.categories().load().await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("BAD"));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

// ── Awaited operations ──────────────────────────────────────────────

#[tokio::test]
async fn test_category_by_slug_not_found() {
    let (server, catalog) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/api/categories/not-a-thing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = catalog.category("not-a-thing").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
    assert!(err.to_string().starts_with("Error from server: \"404"));
}

#[tokio::test]
async fn test_instruments_by_category_validation_error() {
    let (server, catalog) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/api/instruments"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "Category ID must be a non-negative integer"
        })))
        .mount(&server)
        .await;

    let err = catalog.instruments(Some(-1)).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

// ── Access checks ───────────────────────────────────────────────────

#[tokio::test]
async fn test_ensure_can_modify_rejects_non_owner() {
    let (server, catalog) = setup(token()).await;

    Mock::given(method("GET"))
        .and(path("/api/instruments/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instrument(4, "bar|456")))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/instruments/4"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let joe = user("foo|123", vec![]);
    let err = catalog.ensure_can_modify(&joe, 4).await.unwrap_err();
    assert!(matches!(err, CoreError::PermissionDenied { .. }));

    let admin = user("foo|123", vec![Role::Admin]);
    catalog.ensure_can_modify(&admin, 4).await.unwrap();
}

#[tokio::test]
async fn test_delete_of_missing_instrument_is_allowed() {
    let (server, catalog) = setup(token()).await;

    Mock::given(method("GET"))
        .and(path("/api/instruments/99"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/instruments/99"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let joe = user("foo|123", vec![]);
    catalog.ensure_can_modify(&joe, 99).await.unwrap();
    catalog.delete_instrument(99).await.unwrap();
}
