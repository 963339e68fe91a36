// ── Core error types ──
//
// Domain errors for consumers of catalog-core. Callers branch on the
// variant rather than on HTTP status codes; the message is always the
// sentence a user should see.

use catalog_api::ErrorKind;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Reachability ─────────────────────────────────────────────────
    /// No response from the API after retries.
    #[error("{message}")]
    Unreachable { message: String },

    #[error("{message}")]
    Authentication { message: String },

    // ── Server verdicts ──────────────────────────────────────────────
    /// The resource does not exist. Retrying will not help.
    #[error("{message}")]
    NotFound { message: String },

    /// The caller may not modify this resource.
    #[error("{message}")]
    PermissionDenied { message: String },

    #[error("{message}")]
    Validation { message: String },

    /// Any other failed request.
    #[error("{message}")]
    Api {
        message: String,
        /// HTTP status code (if a response was received).
        status: Option<u16>,
    },

    // ── Local ────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The operation was cancelled before it produced an outcome.
    #[error("Operation cancelled")]
    Cancelled,
}

impl CoreError {
    /// Build from an api error classification and its user-facing message.
    pub fn from_kind(kind: ErrorKind, message: String, status: Option<u16>) -> Self {
        match kind {
            ErrorKind::Network => Self::Unreachable { message },
            ErrorKind::AuthAcquisition => Self::Authentication { message },
            ErrorKind::NotFound => Self::NotFound { message },
            ErrorKind::Permission => Self::PermissionDenied { message },
            ErrorKind::Validation => Self::Validation { message },
            ErrorKind::ServerStatus | ErrorKind::Unknown => Self::Api { message, status },
        }
    }

    /// Returns `true` when the failure cannot change on retry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<catalog_api::Error> for CoreError {
    fn from(err: catalog_api::Error) -> Self {
        match err {
            catalog_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            catalog_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            other => CoreError::from_kind(other.kind(), other.ui_message(), other.status()),
        }
    }
}
