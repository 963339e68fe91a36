//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use catalog_config::ConfigError;
use catalog_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(catalog::unreachable),
        help(
            "Check that the API is running and accessible.\n\
             Try: catalog categories list --api-root <URL> -v"
        )
    )]
    Unreachable { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(catalog::auth_failed),
        help(
            "Store a fresh token with: catalog config set-token --profile {profile}\n\
             Or pass --token / set CATALOG_TOKEN."
        )
    )]
    AuthFailed { message: String, profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(catalog::not_found),
        help(
            "Nothing found for: catalog {command}\n\
             Run: catalog {list_command} to see what exists"
        )
    )]
    NotFound {
        message: String,
        command: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(
        code(catalog::permission_denied),
        help("Only the instrument's owner or an admin can edit or delete it.")
    )]
    PermissionDenied { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(catalog::api_error))]
    Api { message: String },

    #[error("Operation cancelled")]
    #[diagnostic(code(catalog::cancelled))]
    Cancelled,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(catalog::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(catalog::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: catalog config init --api-root <URL> --name {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No API root configured")]
    #[diagnostic(
        code(catalog::no_config),
        help(
            "Create a profile with: catalog config init --api-root <URL>\n\
             Or pass --api-root / set CATALOG_API_ROOT.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(catalog::config))]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(catalog::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(catalog::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::Config(ConfigError::NoToken { .. }) => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Convert a core error raised while running `command` (e.g.
    /// `"instruments delete"`).
    pub fn from_core(err: CoreError, profile: &str, command: &str) -> Self {
        match err {
            CoreError::Unreachable { message } => Self::Unreachable { message },
            CoreError::Authentication { message } => Self::AuthFailed {
                message,
                profile: profile.to_owned(),
            },
            CoreError::NotFound { message } => {
                let resource = command.split(' ').next().unwrap_or(command);
                Self::NotFound {
                    message,
                    command: command.to_owned(),
                    list_command: format!("{resource} list"),
                }
            }
            CoreError::PermissionDenied { message } => Self::PermissionDenied { message },
            CoreError::Validation { message } => Self::Validation {
                field: "request".into(),
                reason: message,
            },
            CoreError::Config { message } => Self::Validation {
                field: "configuration".into(),
                reason: message,
            },
            CoreError::Api { message, .. } => Self::Api { message },
            CoreError::Cancelled => Self::Cancelled,
        }
    }
}
