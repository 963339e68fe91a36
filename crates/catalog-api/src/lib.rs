// catalog-api: Async Rust client for the instrument catalog HTTP API.
//
// Retrying request executor with cooperative cancellation, bearer-token
// authentication, and a typed resource façade.

pub mod auth;
pub mod client;
pub mod error;
pub mod executor;
pub mod request;
pub mod retry;
pub mod transport;
pub mod types;

pub use auth::{AuthError, AuthenticatedRequestExecutor, StaticTokenProvider, TokenProvider};
pub use client::ResourceClient;
pub use error::{Error, ErrorKind, NO_RESPONSE_MESSAGE};
pub use executor::{Handlers, Outcome, PendingOperation, RequestExecutor};
pub use request::RequestDescriptor;
pub use retry::{RetryPolicy, is_idempotent};
pub use transport::{TlsMode, TransportConfig};
pub use types::{Category, CategoryList, Instrument, InstrumentDraft, InstrumentList, Role, User};
