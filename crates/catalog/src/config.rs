//! Profile selection and flag overrides on top of `catalog_config`.
//!
//! Produces the `ClientConfig`, token provider, and signed-in identity a
//! command runs with.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use catalog_config::{Config, Profile, profile_to_client_config, resolve_token};
use catalog_core::{ClientConfig, StaticTokenProvider, TlsVerification, TokenProvider, User};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use catalog_config::{config_path, load_config, save_config};

/// Everything a resource command needs.
pub struct Session {
    pub profile: String,
    pub config: ClientConfig,
    pub tokens: Arc<dyn TokenProvider>,
    pub user: Option<User>,
}

/// Profile chosen by `--profile`, then the config default, then "default".
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a session from the config file, the active profile, and flags.
pub fn resolve_session(global: &GlobalOpts) -> Result<Session, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let fallback;
    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile,
        None => {
            // Flags alone can describe the endpoint.
            let Some(api_root) = global.api_root.clone() else {
                if global.profile.is_some() {
                    return Err(profile_not_found(&profile_name, &cfg));
                }
                return Err(CliError::NoConfig {
                    path: config_path().display().to_string(),
                });
            };
            fallback = Profile {
                api_root,
                ..Profile::default()
            };
            &fallback
        }
    };

    let mut config = profile_to_client_config(profile, &cfg.defaults)?;
    apply_overrides(&mut config, global)?;

    let token = match global.token {
        Some(ref token) => Some(SecretString::from(token.clone())),
        None => resolve_token(profile, &profile_name).ok(),
    };
    tracing::debug!(
        profile = %profile_name,
        api_root = %config.api_root,
        has_token = token.is_some(),
        "resolved session"
    );

    Ok(Session {
        tokens: Arc::new(StaticTokenProvider::new(token)),
        user: profile.user.as_ref().map(catalog_config::ProfileUser::to_user),
        profile: profile_name,
        config,
    })
}

fn apply_overrides(config: &mut ClientConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref api_root) = global.api_root {
        config.api_root = api_root.parse().map_err(|_| CliError::Validation {
            field: "api-root".into(),
            reason: format!("invalid URL: {api_root}"),
        })?;
    }
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(())
}

pub fn profile_not_found(name: &str, cfg: &Config) -> CliError {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    names.sort_unstable();
    CliError::ProfileNotFound {
        name: name.to_owned(),
        available: if names.is_empty() {
            "(none)".into()
        } else {
            names.join(", ")
        },
    }
}
