// Request execution with retry and cooperative cancellation.
//
// Every operation runs as its own tokio task racing a CancellationToken.
// Cancelling drops the in-flight future (which aborts the reqwest call)
// and suppresses delivery; `completed()` resolves either way.

use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use hyper::ext::ReasonPhrase;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::request::RequestDescriptor;
use crate::retry::RetryPolicy;
use crate::transport::TransportConfig;

// ── Outcome ──────────────────────────────────────────────────────────

/// Terminal result of an operation that was not cancelled.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Failure { ui_message: String, cause: Error },
}

impl<T> Outcome<T> {
    /// Wrap an error, deriving the user-facing message from it.
    pub fn failure(cause: Error) -> Self {
        Self::Failure {
            ui_message: cause.ui_message(),
            cause,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> Result<T, Error> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure { cause, .. } => Err(cause),
        }
    }
}

impl<T> From<Result<T, Error>> for Outcome<T> {
    fn from(result: Result<T, Error>) -> Self {
        result.map_or_else(Self::failure, Self::Success)
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

type Deliver<T> = Box<dyn FnOnce(Outcome<T>) + Send>;

/// The caller's success/error callbacks for one operation.
///
/// Exactly one of them runs, at most once, and never after cancellation.
pub struct Handlers<T> {
    deliver: Deliver<T>,
}

impl<T: Send + 'static> Handlers<T> {
    pub fn new(
        on_success: impl FnOnce(T) + Send + 'static,
        on_error: impl FnOnce(String, Error) + Send + 'static,
    ) -> Self {
        Self {
            deliver: Box::new(move |outcome| match outcome {
                Outcome::Success(data) => on_success(data),
                Outcome::Failure { ui_message, cause } => on_error(ui_message, cause),
            }),
        }
    }

    /// Handlers that forward the outcome into a oneshot channel.
    ///
    /// The receiver errors if the operation is cancelled, since the
    /// sender is dropped without being used.
    pub fn channel() -> (Self, oneshot::Receiver<Outcome<T>>) {
        let (tx, rx) = oneshot::channel();
        let handlers = Self {
            deliver: Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        };
        (handlers, rx)
    }

    /// Adapt these handlers to an operation producing `U`.
    pub fn map<U: Send + 'static>(self, f: impl FnOnce(U) -> T + Send + 'static) -> Handlers<U> {
        Handlers {
            deliver: Box::new(move |outcome| {
                let mapped = match outcome {
                    Outcome::Success(data) => Outcome::Success(f(data)),
                    Outcome::Failure { ui_message, cause } => {
                        Outcome::Failure { ui_message, cause }
                    }
                };
                (self.deliver)(mapped);
            }),
        }
    }

    fn deliver(self, outcome: Outcome<T>) {
        (self.deliver)(outcome);
    }
}

// ── PendingOperation ─────────────────────────────────────────────────

/// Handle to a running operation.
///
/// [`cancel`](Self::cancel) is idempotent and harmless after completion.
/// [`completed`](Self::completed) always resolves once the operation is
/// terminal, including after cancellation.
#[derive(Clone)]
pub struct PendingOperation {
    cancel: CancellationToken,
    completed: Shared<BoxFuture<'static, ()>>,
}

impl PendingOperation {
    /// Run `work` on a new task and deliver its outcome to `handlers`
    /// unless cancelled first.
    pub fn spawn<T, F>(work: F, handlers: Handlers<T>) -> Self
    where
        T: Send + 'static,
        F: Future<Output = Outcome<T>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    trace!("operation cancelled before completion");
                }
                outcome = work => {
                    if token.is_cancelled() {
                        trace!("operation cancelled, dropping outcome");
                    } else {
                        handlers.deliver(outcome);
                    }
                }
            }
        });

        let completed = async move {
            // A panicking handler still counts as terminal.
            let _ = handle.await;
        }
        .boxed()
        .shared();

        Self { cancel, completed }
    }

    /// An operation whose outcome is already known (e.g. a body that failed to encode).
    pub fn ready<T: Send + 'static>(outcome: Outcome<T>, handlers: Handlers<T>) -> Self {
        Self::spawn(async move { outcome }, handlers)
    }

    /// Stop the operation. Neither handler runs afterwards.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the operation has finished, failed, or been cancelled.
    pub fn completed(&self) -> impl Future<Output = ()> + Send + 'static {
        self.completed.clone()
    }
}

// ── RequestExecutor ──────────────────────────────────────────────────

/// Issues HTTP requests described by [`RequestDescriptor`], retrying per
/// [`RetryPolicy`].
///
/// Cheap to clone: the underlying `reqwest::Client` is reference-counted.
#[derive(Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl RequestExecutor {
    /// Build from a transport config.
    pub fn new(transport: &TransportConfig, retry: RetryPolicy) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            retry,
        })
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, retry: RetryPolicy) -> Self {
        Self { http, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Start `descriptor` in the background, reporting to `handlers`.
    pub fn execute<T>(&self, descriptor: RequestDescriptor, handlers: Handlers<T>) -> PendingOperation
    where
        T: DeserializeOwned + Send + 'static,
    {
        let executor = self.clone();
        PendingOperation::spawn(async move { executor.run(&descriptor).await }, handlers)
    }

    /// Run `descriptor` to a terminal outcome on the current task.
    pub async fn run<T: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> Outcome<T> {
        self.send(descriptor).await.into()
    }

    /// Attempt the request, retrying eligible failures with backoff.
    pub async fn send<T: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> Result<T, Error> {
        let method = descriptor.method();
        let url = descriptor.url();
        let mut retries = 0;

        loop {
            debug!(attempt = retries + 1, %method, %url, "sending request");

            match self.attempt(descriptor).await {
                Ok(data) => return Ok(data),
                Err(err) if self.retry.should_retry(retries, method, &err) => {
                    retries += 1;
                    let delay = self.retry.delay_for(retries);
                    warn!(
                        %method,
                        %url,
                        error = %err,
                        retry = retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    debug!(%method, %url, error = %err, retries, "request failed");
                    return Err(err);
                }
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> Result<T, Error> {
        let url = descriptor.url();

        let mut req = self
            .http
            .request(descriptor.method().clone(), url.clone())
            .headers(descriptor.headers().clone());
        if !descriptor.params().is_empty() {
            req = req.query(descriptor.params());
        }
        if let Some(body) = descriptor.body() {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| Error::from_send(url, e))?;
        let status = resp.status();
        trace!(%url, %status, "received response");

        // Only present when the server's phrase differs from the canonical one.
        let reason = resp
            .extensions()
            .get::<ReasonPhrase>()
            .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned());

        // The server has seen the request by now, so a broken body is not
        // a missing response.
        let body = resp.text().await.map_err(|e| Error::Body {
            status,
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if status.is_success() {
            decode(body)
        } else {
            Err(Error::from_response(status, reason, url, body))
        }
    }
}

/// Parse a success body. Empty bodies (204) decode as JSON `null`, so
/// `()` and `Option<_>` targets work.
fn decode<T: DeserializeOwned>(body: String) -> Result<T, Error> {
    let parsed = if body.trim().is_empty() {
        serde_json::from_value(serde_json::Value::Null)
    } else {
        serde_json::from_str(&body)
    };

    parsed.map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn empty_body_decodes_as_unit() {
        decode::<()>(String::new()).unwrap();
        assert!(decode::<Option<u32>>(" \n".into()).unwrap().is_none());
    }

    #[test]
    fn invalid_body_keeps_raw_text() {
        let err = decode::<serde_json::Value>("<html>".into()).unwrap_err();
        match err {
            Error::Deserialization { body, .. } => assert_eq!(body, "<html>"),
            other => panic!("expected Deserialization, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handlers_map_transforms_success() {
        let (handlers, rx) = Handlers::<usize>::channel();
        let op = PendingOperation::ready(
            Outcome::Success("four".to_string()),
            handlers.map(|s: String| s.len()),
        );
        op.completed().await;

        assert!(matches!(rx.await.unwrap(), Outcome::Success(4)));
    }

    #[tokio::test]
    async fn cancelled_operation_skips_handlers_and_completes() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let handlers = Handlers::new(
            move |(): ()| flag.store(true, Ordering::SeqCst),
            |_, _| panic!("on_error must not run"),
        );

        let op = PendingOperation::spawn(
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Outcome::Success(())
            },
            handlers,
        );
        op.cancel();
        op.completed().await;
        op.cancel();

        assert!(op.is_cancelled());
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn completed_can_be_awaited_repeatedly() {
        let (handlers, _rx) = Handlers::<()>::channel();
        let op = PendingOperation::ready(Outcome::Success(()), handlers);
        op.completed().await;
        op.completed().await;
        op.cancel();
    }
}
