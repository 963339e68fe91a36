// Typed façade over the catalog HTTP API.
//
// One method per remote operation. Reads go straight to the
// RequestExecutor; mutations go through the AuthenticatedRequestExecutor.
// Nothing is cached here.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::{AuthenticatedRequestExecutor, TokenProvider};
use crate::error::Error;
use crate::executor::{Handlers, Outcome, PendingOperation, RequestExecutor};
use crate::request::RequestDescriptor;
use crate::types::{Category, CategoryList, Instrument, InstrumentDraft, InstrumentList};

/// Async client for the catalog API.
///
/// Cheap to clone. Mutating operations need a token provider, attached
/// with [`with_token_provider`](Self::with_token_provider); without one
/// they fail with an authentication error and send nothing.
#[derive(Clone)]
pub struct ResourceClient {
    base_url: Url,
    requests: RequestExecutor,
    authenticated: Option<AuthenticatedRequestExecutor>,
}

impl ResourceClient {
    /// Build against `api_root` (e.g. `http://localhost:3001/api`).
    pub fn new(api_root: &str, requests: RequestExecutor) -> Result<Self, Error> {
        Self::from_url(Url::parse(api_root)?, requests)
    }

    pub fn from_url(mut base_url: Url, requests: RequestExecutor) -> Result<Self, Error> {
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            requests,
            authenticated: None,
        })
    }

    /// Enable mutations, acquiring bearer tokens from `tokens`.
    pub fn with_token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.authenticated = Some(AuthenticatedRequestExecutor::new(
            self.requests.clone(),
            tokens,
        ));
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn can_mutate(&self) -> bool {
        self.authenticated.is_some()
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn read<T>(&self, descriptor: RequestDescriptor, handlers: Handlers<T>) -> PendingOperation
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.requests.execute(descriptor, handlers)
    }

    fn mutate<T>(
        &self,
        descriptor: Result<RequestDescriptor, Error>,
        handlers: Handlers<T>,
    ) -> PendingOperation
    where
        T: DeserializeOwned + Send + 'static,
    {
        let descriptor = match descriptor {
            Ok(d) => d,
            Err(e) => return PendingOperation::ready(Outcome::failure(e), handlers),
        };
        match &self.authenticated {
            Some(auth) => auth.execute_authenticated(descriptor, handlers),
            None => PendingOperation::ready(
                Outcome::failure(Error::Authentication {
                    message: "no token provider configured".into(),
                }),
                handlers,
            ),
        }
    }

    // ── Categories ───────────────────────────────────────────────────

    /// `GET /categories`
    pub fn list_categories(&self, handlers: Handlers<CategoryList>) -> PendingOperation {
        self.read(RequestDescriptor::get(self.endpoint(&["categories"])), handlers)
    }

    /// `GET /categories/{slug}`
    ///
    /// A blank slug fails with [`Error::InvalidArgument`] and sends nothing.
    pub fn get_category_by_slug(&self, slug: &str, handlers: Handlers<Category>) -> PendingOperation {
        if slug.trim().is_empty() {
            return PendingOperation::ready(
                Outcome::failure(Error::InvalidArgument {
                    field: "slug",
                    reason: "must not be empty".into(),
                }),
                handlers,
            );
        }
        self.read(
            RequestDescriptor::get(self.endpoint(&["categories", slug])),
            handlers,
        )
    }

    // ── Instruments ──────────────────────────────────────────────────

    /// `GET /instruments/all`
    pub fn list_instruments(&self, handlers: Handlers<InstrumentList>) -> PendingOperation {
        self.read(
            RequestDescriptor::get(self.endpoint(&["instruments", "all"])),
            handlers,
        )
    }

    /// `GET /instruments?cat={category_id}`
    ///
    /// The server validates the id; negative values come back as a 400.
    pub fn list_instruments_by_category(
        &self,
        category_id: i64,
        handlers: Handlers<InstrumentList>,
    ) -> PendingOperation {
        self.read(
            RequestDescriptor::get(self.endpoint(&["instruments"])).with_param("cat", category_id),
            handlers,
        )
    }

    /// `GET /instruments/{id}`
    pub fn get_instrument_by_id(&self, id: i64, handlers: Handlers<Instrument>) -> PendingOperation {
        let id = id.to_string();
        self.read(
            RequestDescriptor::get(self.endpoint(&["instruments", &id])),
            handlers,
        )
    }

    /// `POST /instruments` (authenticated)
    pub fn create_instrument(
        &self,
        draft: &InstrumentDraft,
        handlers: Handlers<Instrument>,
    ) -> PendingOperation {
        let descriptor = RequestDescriptor::post(self.endpoint(&["instruments"])).with_json(draft);
        self.mutate(descriptor, handlers)
    }

    /// `PUT /instruments/{id}` (authenticated; owner or admin)
    pub fn update_instrument(
        &self,
        id: i64,
        draft: &InstrumentDraft,
        handlers: Handlers<Instrument>,
    ) -> PendingOperation {
        let id = id.to_string();
        let descriptor =
            RequestDescriptor::put(self.endpoint(&["instruments", &id])).with_json(draft);
        self.mutate(descriptor, handlers)
    }

    /// `DELETE /instruments/{id}` (authenticated; owner or admin)
    ///
    /// Deleting an id that does not exist succeeds.
    pub fn delete_instrument(&self, id: i64, handlers: Handlers<()>) -> PendingOperation {
        let id = id.to_string();
        let descriptor = RequestDescriptor::delete(self.endpoint(&["instruments", &id]));
        self.mutate(Ok(descriptor), handlers)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;

    fn client(root: &str) -> ResourceClient {
        let requests = RequestExecutor::with_client(reqwest::Client::new(), RetryPolicy::none());
        ResourceClient::new(root, requests).unwrap()
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let c = client("http://localhost:3001/api");
        assert_eq!(c.base_url().as_str(), "http://localhost:3001/api/");
    }

    #[test]
    fn endpoint_encodes_segments() {
        let c = client("http://localhost:3001/api/");
        let url = c.endpoint(&["categories", "brass winds"]);
        assert_eq!(url.as_str(), "http://localhost:3001/api/categories/brass%20winds");
    }

    #[test]
    fn cannot_be_a_base_is_rejected() {
        let requests = RequestExecutor::with_client(reqwest::Client::new(), RetryPolicy::none());
        assert!(ResourceClient::new("mailto:someone@example.com", requests).is_err());
    }

    #[test]
    fn mutations_need_a_token_provider() {
        assert!(!client("http://localhost/").can_mutate());
    }
}
