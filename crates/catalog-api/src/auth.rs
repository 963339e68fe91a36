use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::Error;
use crate::executor::{Handlers, Outcome, PendingOperation, RequestExecutor};
use crate::request::RequestDescriptor;

/// Failure reported by a [`TokenProvider`].
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AuthError {
    message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Source of bearer tokens for authenticated requests.
///
/// Implemented by whatever owns the user's session (an OAuth client, a
/// keyring lookup, a fixed test token). Acquisition may suspend.
pub trait TokenProvider: Send + Sync {
    fn acquire(&self) -> BoxFuture<'_, Result<SecretString, AuthError>>;
}

/// Hands out one preconfigured token, or fails when none is set.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<SecretString>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<SecretString>) -> Self {
        Self { token }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn acquire(&self) -> BoxFuture<'_, Result<SecretString, AuthError>> {
        let token = self
            .token
            .clone()
            .ok_or_else(|| AuthError::new("no access token configured"));
        async move { token }.boxed()
    }
}

/// Acquires a bearer token, then delegates to a [`RequestExecutor`].
///
/// Token acquisition and the request share one cancellation handle:
/// cancelling while the token is pending means no request is ever sent,
/// cancelling afterwards aborts the request.
#[derive(Clone)]
pub struct AuthenticatedRequestExecutor {
    inner: RequestExecutor,
    tokens: Arc<dyn TokenProvider>,
}

impl AuthenticatedRequestExecutor {
    pub fn new(inner: RequestExecutor, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { inner, tokens }
    }

    /// Start an authenticated request in the background.
    pub fn execute_authenticated<T>(
        &self,
        descriptor: RequestDescriptor,
        handlers: Handlers<T>,
    ) -> PendingOperation
    where
        T: DeserializeOwned + Send + 'static,
    {
        let executor = self.clone();
        PendingOperation::spawn(async move { executor.run(descriptor).await }, handlers)
    }

    /// Acquire a token and run `descriptor` with it. Token failures are not retried.
    pub async fn run<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Outcome<T> {
        let token = match self.tokens.acquire().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, url = %descriptor.url(), "token acquisition failed");
                return Outcome::failure(Error::Authentication {
                    message: e.to_string(),
                });
            }
        };
        debug!(url = %descriptor.url(), "token acquired");

        match descriptor.with_bearer(&token) {
            Ok(authorized) => self.inner.run(&authorized).await,
            Err(e) => Outcome::failure(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[tokio::test]
    async fn static_provider_returns_token() {
        let provider = StaticTokenProvider::new(Some("t0k3n".to_string().into()));
        let token = provider.acquire().await.unwrap();
        assert_eq!(token.expose_secret(), "t0k3n");
    }

    #[tokio::test]
    async fn static_provider_without_token_fails() {
        let err = StaticTokenProvider::default().acquire().await.unwrap_err();
        assert_eq!(err.to_string(), "no access token configured");
    }
}
