//! Config subcommand handlers.

use std::io::BufRead;

use secrecy::SecretString;

use catalog_config::{delete_token, store_token};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, active_profile_name, profile_not_found};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { api_root, name } => {
            if url::Url::parse(&api_root).is_err() {
                return Err(CliError::Validation {
                    field: "api-root".into(),
                    reason: format!("invalid URL: {api_root}"),
                });
            }
            let mut cfg = config::load_config()?;
            let profile = cfg.profiles.entry(name.clone()).or_default();
            profile.api_root = api_root;
            if cfg.profiles.len() == 1 {
                cfg.default_profile = Some(name.clone());
            }
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!(
                    "Profile '{name}' saved to {}",
                    config::config_path().display()
                );
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = config::load_config()?;
            for profile in cfg.profiles.values_mut() {
                if profile.token.is_some() {
                    profile.token = Some(REDACTED.into());
                }
            }
            let out = toml::to_string_pretty(&cfg).map_err(catalog_config::ConfigError::from)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let default = active_profile_name(global, &cfg);
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort_unstable();
            let out = names
                .into_iter()
                .map(|name| {
                    let marker = if *name == default { "*" } else { " " };
                    format!("{marker} {name}\t{}", cfg.profiles[name].api_root)
                })
                .collect::<Vec<_>>()
                .join("\n");
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(&name, &cfg));
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetToken { profile } => {
            let cfg = config::load_config()?;
            let name = profile.unwrap_or_else(|| active_profile_name(global, &cfg));

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            let token = line.trim();
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "no token on stdin".into(),
                });
            }
            store_token(&name, &SecretString::from(token.to_owned()))?;
            if !global.quiet {
                eprintln!("Token stored in system keyring for '{name}'");
            }
            Ok(())
        }

        ConfigCommand::ClearToken { profile } => {
            let cfg = config::load_config()?;
            let name = profile.unwrap_or_else(|| active_profile_name(global, &cfg));
            delete_token(&name)?;
            if !global.quiet {
                eprintln!("Token removed from system keyring for '{name}'");
            }
            Ok(())
        }
    }
}
