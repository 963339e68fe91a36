#![allow(clippy::unwrap_used)]
// Integration tests for `ResourceClient` and bearer authentication using wiremock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use catalog_api::{
    AuthError, ErrorKind, Handlers, InstrumentDraft, Outcome, PendingOperation, RequestExecutor,
    ResourceClient, RetryPolicy, StaticTokenProvider, TokenProvider,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn requests() -> RequestExecutor {
    RequestExecutor::with_client(
        reqwest::Client::new(),
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(20),
        },
    )
}

async fn setup() -> (MockServer, ResourceClient) {
    let server = MockServer::start().await;
    let client = ResourceClient::new(&server.uri(), requests()).unwrap();
    (server, client)
}

async fn setup_authenticated(tokens: Arc<dyn TokenProvider>) -> (MockServer, ResourceClient) {
    let (server, client) = setup().await;
    (server, client.with_token_provider(tokens))
}

fn static_token(token: &str) -> Arc<dyn TokenProvider> {
    Arc::new(StaticTokenProvider::new(Some(SecretString::from(
        token.to_string(),
    ))))
}

async fn outcome_of<T: Send + 'static>(
    start: impl FnOnce(Handlers<T>) -> PendingOperation,
) -> Outcome<T> {
    let (handlers, rx) = Handlers::channel();
    let op = start(handlers);
    op.completed().await;
    rx.await.unwrap()
}

fn draft() -> InstrumentDraft {
    InstrumentDraft {
        name: "Flute".into(),
        category_id: 0,
        summary: "Flute summary".into(),
        description: "Long description of flutes.".into(),
        image_url: "https://example.com/flute.jpg".into(),
    }
}

fn flute_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "categoryId": 0,
        "userId": "google-oauth2|1337",
        "name": "Flute",
        "summary": "Flute summary",
        "description": "Long description of flutes.",
        "imageUrl": "https://example.com/flute.jpg"
    })
}

/// Counts acquisitions and waits `delay` before handing out a token.
struct SlowProvider {
    delay: Duration,
    calls: AtomicUsize,
}

impl TokenProvider for SlowProvider {
    fn acquire(&self) -> BoxFuture<'_, Result<SecretString, AuthError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(self.delay).await;
            Ok(SecretString::from("slow-token".to_string()))
        }
        .boxed()
    }
}

struct FailingProvider;

impl TokenProvider for FailingProvider {
    fn acquire(&self) -> BoxFuture<'_, Result<SecretString, AuthError>> {
        async { Err(AuthError::new("login_required")) }.boxed()
    }
}

// ── Categories ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_categories() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "categories": [{
                "id": 0,
                "name": "Woodwinds",
                "slug": "winds",
                "itemCount": 4,
                "summary": "Flutes and such",
                "description": "Instruments you blow into."
            }]
        })))
        .mount(&server)
        .await;

    let list = outcome_of(|h| client.list_categories(h))
        .await
        .into_result()
        .unwrap();

    assert_eq!(list.categories.len(), 1);
    assert_eq!(list.categories[0].slug, "winds");
    assert_eq!(list.categories[0].item_count, 4);
}

#[tokio::test]
async fn test_get_category_by_slug() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/categories/winds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 0,
            "name": "Woodwinds",
            "slug": "winds",
            "itemCount": 4,
            "summary": "Flutes and such",
            "description": "Instruments you blow into."
        })))
        .mount(&server)
        .await;

    let category = outcome_of(|h| client.get_category_by_slug("winds", h))
        .await
        .into_result()
        .unwrap();
    assert_eq!(category.name, "Woodwinds");
}

#[tokio::test]
async fn test_get_category_by_unknown_slug_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/categories/not-a-thing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "No such category" })),
        )
        .mount(&server)
        .await;

    let outcome = outcome_of(|h| client.get_category_by_slug("not-a-thing", h)).await;

    match outcome {
        Outcome::Failure { ui_message, cause } => {
            assert_eq!(cause.status(), Some(404));
            assert!(cause.is_not_found());
            assert_eq!(
                ui_message,
                "Error from server: \"404 Not Found\". No such category"
            );
        }
        Outcome::Success(_) => panic!("expected 404"),
    }
    // 4xx is never retried.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_blank_slug_is_rejected_without_request() {
    let (server, client) = setup().await;

    for slug in ["", "  "] {
        let outcome = outcome_of(|h| client.get_category_by_slug(slug, h)).await;
        match outcome {
            Outcome::Failure { ui_message, cause } => {
                assert_eq!(cause.kind(), ErrorKind::Validation);
                assert_eq!(cause.status(), None);
                assert_eq!(ui_message, "Invalid slug: must not be empty");
            }
            Outcome::Success(_) => panic!("expected a validation failure"),
        }
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ── Instruments: reads ──────────────────────────────────────────────

#[tokio::test]
async fn test_list_instruments() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/instruments/all"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "instruments": [flute_json(1), flute_json(2)] })),
        )
        .mount(&server)
        .await;

    let list = outcome_of(|h| client.list_instruments(h))
        .await
        .into_result()
        .unwrap();
    assert_eq!(list.instruments.len(), 2);
}

#[tokio::test]
async fn test_list_instruments_by_category() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/instruments"))
        .and(query_param("cat", "0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "instruments": [flute_json(1)] })),
        )
        .mount(&server)
        .await;

    let list = outcome_of(|h| client.list_instruments_by_category(0, h))
        .await
        .into_result()
        .unwrap();
    assert_eq!(list.instruments[0].user_id, "google-oauth2|1337");
}

#[tokio::test]
async fn test_get_instrument_by_id() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/instruments/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(flute_json(7)))
        .mount(&server)
        .await;

    let instrument = outcome_of(|h| client.get_instrument_by_id(7, h))
        .await
        .into_result()
        .unwrap();
    assert_eq!(instrument.id, 7);
}

// ── Instruments: mutations ──────────────────────────────────────────

#[tokio::test]
async fn test_create_instrument_sends_bearer_and_body() {
    let (server, client) = setup_authenticated(static_token("t0k3n")).await;

    Mock::given(method("POST"))
        .and(path("/instruments"))
        .and(header("authorization", "Bearer t0k3n"))
        .and(body_json(json!({
            "name": "Flute",
            "categoryId": 0,
            "summary": "Flute summary",
            "description": "Long description of flutes.",
            "imageUrl": "https://example.com/flute.jpg"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(flute_json(11)))
        .expect(1)
        .mount(&server)
        .await;

    let created = outcome_of(|h| client.create_instrument(&draft(), h))
        .await
        .into_result()
        .unwrap();
    assert_eq!(created.id, 11);
}

#[tokio::test]
async fn test_update_instrument() {
    let (server, client) = setup_authenticated(static_token("t0k3n")).await;

    Mock::given(method("PUT"))
        .and(path("/instruments/11"))
        .and(header("authorization", "Bearer t0k3n"))
        .respond_with(ResponseTemplate::new(200).set_body_json(flute_json(11)))
        .mount(&server)
        .await;

    let updated = outcome_of(|h| client.update_instrument(11, &draft(), h))
        .await
        .into_result()
        .unwrap();
    assert_eq!(updated.name, "Flute");
}

#[tokio::test]
async fn test_delete_instrument() {
    let (server, client) = setup_authenticated(static_token("t0k3n")).await;

    Mock::given(method("DELETE"))
        .and(path("/instruments/11"))
        .and(header("authorization", "Bearer t0k3n"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = outcome_of(|h| client.delete_instrument(11, h)).await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_mutation_forbidden_for_non_owner() {
    let (server, client) = setup_authenticated(static_token("t0k3n")).await;

    Mock::given(method("DELETE"))
        .and(path("/instruments/11"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": "Only the owner or an admin may do that"
        })))
        .mount(&server)
        .await;

    let outcome = outcome_of(|h| client.delete_instrument(11, h)).await;
    match outcome {
        Outcome::Failure { cause, .. } => assert_eq!(cause.status(), Some(403)),
        Outcome::Success(()) => panic!("expected 403"),
    }
}

#[tokio::test]
async fn test_mutation_without_provider_sends_nothing() {
    let (server, client) = setup().await;

    let outcome = outcome_of(|h| client.delete_instrument(11, h)).await;

    match outcome {
        Outcome::Failure { ui_message, .. } => assert!(
            ui_message.starts_with("Error authenticating your request:"),
            "{ui_message}"
        ),
        Outcome::Success(()) => panic!("expected auth failure"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_token_failure_reports_auth_message() {
    let (server, client) = setup_authenticated(Arc::new(FailingProvider)).await;

    let outcome = outcome_of(|h| client.create_instrument(&draft(), h)).await;

    match outcome {
        Outcome::Failure { ui_message, .. } => assert_eq!(
            ui_message,
            "Error authenticating your request: \"login_required\". Try logging out and back in again."
        ),
        Outcome::Success(_) => panic!("expected auth failure"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

// ── Cancellation of authenticated requests ──────────────────────────

#[tokio::test]
async fn test_cancel_while_token_pending_sends_nothing() {
    let provider = Arc::new(SlowProvider {
        delay: Duration::from_millis(200),
        calls: AtomicUsize::new(0),
    });
    let (server, client) = setup_authenticated(provider.clone()).await;

    Mock::given(method("POST"))
        .and(path("/instruments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(flute_json(1)))
        .mount(&server)
        .await;

    let called = Arc::new(AtomicBool::new(false));
    let (ok, err) = (Arc::clone(&called), Arc::clone(&called));
    let op = client.create_instrument(
        &draft(),
        Handlers::new(
            move |_| ok.store(true, Ordering::SeqCst),
            move |_, _| err.store(true, Ordering::SeqCst),
        ),
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    op.cancel();
    op.completed().await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
    assert!(!called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_cancel_after_send_suppresses_handlers() {
    let (server, client) = setup_authenticated(static_token("t0k3n")).await;

    Mock::given(method("PUT"))
        .and(path("/instruments/5"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(flute_json(5))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let called = Arc::new(AtomicBool::new(false));
    let (ok, err) = (Arc::clone(&called), Arc::clone(&called));
    let op = client.update_instrument(
        5,
        &draft(),
        Handlers::new(
            move |_| ok.store(true, Ordering::SeqCst),
            move |_, _| err.store(true, Ordering::SeqCst),
        ),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    op.cancel();
    op.completed().await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert!(!called.load(Ordering::SeqCst));
}
