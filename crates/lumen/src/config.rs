//! CLI configuration: thin wrapper around `lumen_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--server, --timeout-ms, --retries).

use std::time::Duration;

use lumen_core::ClientConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use lumen_config::{
    Config, Profile, config_path, load_config_or_default, parse_server, profile_to_client_config,
    save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Build the runtime `ClientConfig`: profile first, then flag overrides.
///
/// `--server` alone is enough; without it a profile must exist. Naming a
/// profile that does not exist is an error even when `--server` is given.
pub fn resolve_client_config(global: &GlobalOpts, cfg: &Config) -> Result<ClientConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut client = match (cfg.profiles.get(&profile_name), global.server.as_deref()) {
        (Some(profile), server) => {
            let mut client = profile_to_client_config(profile, &cfg.defaults)?;
            if let Some(server) = server {
                client.base_url = parse_server(server)?;
            }
            client
        }
        (None, Some(server)) if global.profile.is_none() => {
            let mut client = ClientConfig::new(parse_server(server)?);
            client.timeout = Duration::from_millis(cfg.defaults.timeout_ms);
            client.retries = cfg.defaults.retries;
            client
        }
        (None, _) if global.profile.is_some() => {
            let names = cfg.profile_names();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        (None, _) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ms) = global.timeout_ms {
        client.timeout = Duration::from_millis(ms);
    }
    if let Some(retries) = global.retries {
        client.retries = retries;
    }
    // One-shot commands have nobody to poll for.
    client.poll_interval = Duration::ZERO;
    Ok(client)
}
