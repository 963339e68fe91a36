// catalog-core: Shared reference-data cache and domain services over catalog-api.

pub mod access;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;

// ── Primary re-exports ──────────────────────────────────────────────
pub use access::{Owned, can_edit_or_delete, is_admin};
pub use cache::{CacheState, SharedReferenceCache, Snapshot, Subscription};
pub use catalog::{Catalog, category_cache};
pub use config::{ClientConfig, DEFAULT_CACHE_RETRY_DELAY, TlsVerification};
pub use error::CoreError;

// Re-export the wire types consumers handle directly.
pub use catalog_api::{
    Category, Instrument, InstrumentDraft, Role, StaticTokenProvider, TokenProvider, User,
};
