use reqwest::{Method, StatusCode};
use thiserror::Error;

use crate::retry::is_idempotent;

/// Shown when the request never produced a response.
pub const NO_RESPONSE_MESSAGE: &str =
    "Couldn't reach the server. Please try reloading in a minute.";

/// Appended to status errors when the server did not supply its own `error` field.
const BUG_REPORT_HINT: &str = "Please send a bug report!";

/// Coarse classification of a failed request.
///
/// Callers branch on this instead of matching raw HTTP status codes;
/// [`ErrorKind::NotFound`] in particular separates "doesn't exist" from
/// "try again later".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No usable response (connection refused, DNS, timeout, body cut off).
    Network,
    /// A response arrived with an error status not covered below.
    ServerStatus,
    /// The token provider failed before any request was sent.
    AuthAcquisition,
    /// HTTP 403.
    Permission,
    /// HTTP 404. Retrying cannot change the outcome.
    NotFound,
    /// HTTP 400, usually with a server-supplied `error` field.
    Validation,
    /// Local failure that fits nowhere else.
    Unknown,
}

/// Top-level error type for the `catalog-api` crate.
///
/// Keeps enough of the failure (status, raw body, or the absence of a
/// response) for [`Error::kind`] and [`Error::ui_message`] to classify it.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// The request was sent but no response came back.
    #[error("No response from {url}: {message}")]
    Network { url: String, message: String },

    /// The status line arrived but the body broke off.
    ///
    /// Unlike [`Error::Network`], the server may already have acted on
    /// the request.
    #[error("Incomplete response ({status}) from {url}: {message}")]
    Body {
        status: StatusCode,
        url: String,
        message: String,
    },

    /// The response carried a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        status: StatusCode,
        /// Reason phrase sent by the server, when it differs from the canonical one.
        reason: Option<String>,
        url: String,
        body: String,
        /// The `error` field of a `{ "error": "..." }` body, when present.
        server_message: Option<String>,
    },

    /// The request could not be built (bad header value, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// An argument was rejected before any request was built.
    #[error("Invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    // ── Authentication ──────────────────────────────────────────────
    /// The token provider failed, so the request was never sent.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A request body could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl Error {
    /// Build a status error from a response, extracting `{ "error": ... }` if the body has one.
    pub fn from_status(status: StatusCode, url: &url::Url, body: String) -> Self {
        Self::from_response(status, None, url, body)
    }

    /// Like [`from_status`](Self::from_status), keeping the server's own reason phrase.
    pub fn from_response(
        status: StatusCode,
        reason: Option<String>,
        url: &url::Url,
        body: String,
    ) -> Self {
        let server_message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);
        Self::Status {
            status,
            reason,
            url: url.to_string(),
            body,
            server_message,
        }
    }

    /// Map a `reqwest` send failure. Anything other than a builder error
    /// means the server never answered.
    pub(crate) fn from_send(url: &url::Url, err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Transport(err)
        } else {
            Self::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::Body { .. } => ErrorKind::Network,
            Self::Status { status, .. } => match *status {
                StatusCode::NOT_FOUND => ErrorKind::NotFound,
                StatusCode::FORBIDDEN => ErrorKind::Permission,
                StatusCode::BAD_REQUEST => ErrorKind::Validation,
                _ => ErrorKind::ServerStatus,
            },
            Self::InvalidArgument { .. } => ErrorKind::Validation,
            Self::Authentication { .. } => ErrorKind::AuthAcquisition,
            Self::Transport(_)
            | Self::InvalidUrl(_)
            | Self::Tls(_)
            | Self::Deserialization { .. }
            | Self::Serialization(_) => ErrorKind::Unknown,
        }
    }

    /// HTTP status of the response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::Body { status, .. } => Some(status.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` for a 404: the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Whether another attempt of a `method` request could succeed.
    ///
    /// Missing responses are always retryable. A 5xx or a truncated body is
    /// retryable only for idempotent methods, since the server may already
    /// have applied a POST.
    pub fn is_retryable_for(&self, method: &Method) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Body { .. } => is_idempotent(method),
            Self::Status { status, .. } => status.is_server_error() && is_idempotent(method),
            _ => false,
        }
    }

    /// A sentence suitable for showing to a user as-is.
    pub fn ui_message(&self) -> String {
        match self {
            Self::Status {
                status,
                reason,
                server_message,
                ..
            } => format!(
                "Error from server: \"{}\". {}",
                status_line(*status, reason.as_deref()),
                server_message.as_deref().unwrap_or(BUG_REPORT_HINT)
            ),
            Self::Network { .. } | Self::Body { .. } => NO_RESPONSE_MESSAGE.to_owned(),
            Self::Authentication { message } => format!(
                "Error authenticating your request: \"{message}\". Try logging out and back in again."
            ),
            Self::InvalidArgument { .. } => self.to_string(),
            other => format!("Unknown error: {other}"),
        }
    }
}

/// `"<code> <reason>"`: the server's reason phrase if it sent its own,
/// else the canonical one, else just the code.
fn status_line(status: StatusCode, reason: Option<&str>) -> String {
    match reason.or_else(|| status.canonical_reason()) {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}
