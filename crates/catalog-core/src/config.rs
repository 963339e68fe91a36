// ── Runtime client configuration ──
//
// Describes *how* to talk to the catalog API. Never touches disk: the
// CLI (via catalog-config) or a test builds a `ClientConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use catalog_api::{RetryPolicy, TlsMode, TransportConfig};
use url::Url;

/// Delay between attempts to populate the shared category cache.
pub const DEFAULT_CACHE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (local development servers).
    DangerAcceptInvalid,
}

/// Configuration for one catalog API endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:3001/api`.
    pub api_root: Url,
    pub tls: TlsVerification,
    /// Transport timeout per attempt. The only timeout in the stack.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// How long the category cache waits before refetching after a transient failure.
    pub cache_retry_delay: Duration,
}

impl ClientConfig {
    pub fn new(api_root: Url) -> Self {
        Self {
            api_root,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            cache_retry_delay: DEFAULT_CACHE_RETRY_DELAY,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
