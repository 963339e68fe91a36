// ── Catalog façade ──
//
// Wires a ResourceClient and the shared category cache from one
// ClientConfig, and offers awaitable wrappers over the callback API.

use std::sync::Arc;
use std::time::Duration;

use catalog_api::{
    Category, CategoryList, Handlers, Instrument, InstrumentDraft, InstrumentList, Outcome,
    PendingOperation, RequestExecutor, ResourceClient, TokenProvider, User,
};
use tracing::debug;

use crate::access::can_edit_or_delete;
use crate::cache::SharedReferenceCache;
use crate::config::ClientConfig;
use crate::error::CoreError;

/// Build the category cache on top of `client`.
pub fn category_cache(
    client: &ResourceClient,
    retry_delay: Duration,
) -> SharedReferenceCache<Vec<Category>> {
    let client = client.clone();
    SharedReferenceCache::new("categories", retry_delay, move |handlers| {
        client.list_categories(handlers.map(|list: CategoryList| list.categories))
    })
}

/// Entry point for consumers: one API endpoint, one category cache.
///
/// Cheaply cloneable; clones share the cache.
#[derive(Clone)]
pub struct Catalog {
    config: ClientConfig,
    client: ResourceClient,
    categories: SharedReferenceCache<Vec<Category>>,
}

impl Catalog {
    /// Build from configuration. Mutations need `tokens`.
    pub fn new(
        config: ClientConfig,
        tokens: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self, CoreError> {
        let requests = RequestExecutor::new(&config.transport(), config.retry.clone())?;
        let mut client = ResourceClient::from_url(config.api_root.clone(), requests)?;
        if let Some(tokens) = tokens {
            client = client.with_token_provider(tokens);
        }
        let categories = category_cache(&client, config.cache_retry_delay);
        debug!(api_root = %config.api_root, "catalog ready");

        Ok(Self {
            config,
            client,
            categories,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn client(&self) -> &ResourceClient {
        &self.client
    }

    pub fn categories(&self) -> &SharedReferenceCache<Vec<Category>> {
        &self.categories
    }

    /// Start an operation and wait for its outcome.
    pub async fn call<T: Send + 'static>(
        &self,
        start: impl FnOnce(&ResourceClient, Handlers<T>) -> PendingOperation,
    ) -> Result<T, CoreError> {
        let (handlers, outcome) = Handlers::channel();
        let _operation = start(&self.client, handlers);
        match outcome.await {
            Ok(Outcome::Success(data)) => Ok(data),
            Ok(Outcome::Failure { cause, .. }) => Err(cause.into()),
            Err(_) => Err(CoreError::Cancelled),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn category(&self, slug: &str) -> Result<Category, CoreError> {
        self.call(|c, h| c.get_category_by_slug(slug, h)).await
    }

    /// All instruments, or only those in `category_id`.
    pub async fn instruments(&self, category_id: Option<i64>) -> Result<Vec<Instrument>, CoreError> {
        let list: InstrumentList = match category_id {
            Some(id) => self.call(|c, h| c.list_instruments_by_category(id, h)).await?,
            None => self.call(ResourceClient::list_instruments).await?,
        };
        Ok(list.instruments)
    }

    pub async fn instrument(&self, id: i64) -> Result<Instrument, CoreError> {
        self.call(|c, h| c.get_instrument_by_id(id, h)).await
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub async fn create_instrument(&self, draft: &InstrumentDraft) -> Result<Instrument, CoreError> {
        self.call(|c, h| c.create_instrument(draft, h)).await
    }

    pub async fn update_instrument(
        &self,
        id: i64,
        draft: &InstrumentDraft,
    ) -> Result<Instrument, CoreError> {
        self.call(|c, h| c.update_instrument(id, draft, h)).await
    }

    pub async fn delete_instrument(&self, id: i64) -> Result<(), CoreError> {
        self.call(|c, h| c.delete_instrument(id, h)).await
    }

    /// Fetch instrument `id` and check that `user` may modify it.
    ///
    /// A missing instrument passes, so deletes stay idempotent.
    pub async fn ensure_can_modify(&self, user: &User, id: i64) -> Result<(), CoreError> {
        match self.instrument(id).await {
            Ok(instrument) if can_edit_or_delete(Some(user), &instrument) => Ok(()),
            Ok(instrument) => Err(CoreError::PermissionDenied {
                message: format!(
                    "{} may not modify instrument {} (owned by {:?})",
                    user.name, instrument.id, instrument.user_id
                ),
            }),
            Err(CoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
