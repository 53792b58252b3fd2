//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"GITHUB_TOKEN"`).
//! - At startup, callers invoke [`resolve_secrets`] once and pass the
//!   result into adapter constructors; nothing else reads credentials
//!   from the environment.
//! - `Debug` output redacts every value.
//! - Error messages reference the env var **NAME**, never the value.
//!
//! Every credential is required: the GitHub token, both halves of the
//! Freshdesk basic-auth pair, and the database URL.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::read_str_at;

pub const DEFAULT_GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const DEFAULT_FRESHDESK_TOKEN_ENV: &str = "FRESHDESK_TOKEN";
pub const DEFAULT_FRESHDESK_PASSWORD_ENV: &str = "FRESHDESK_PASSWORD";
pub const DEFAULT_DATABASE_URL_ENV: &str = "HUBSYNC_DATABASE_URL";

/// All runtime-resolved secrets for one process.
#[derive(Clone)]
pub struct ResolvedSecrets {
    pub github_token: String,
    pub freshdesk_token: String,
    pub freshdesk_password: String,
    pub database_url: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("github_token", &"<REDACTED>")
            .field("freshdesk_token", &"<REDACTED>")
            .field("freshdesk_password", &"<REDACTED>")
            .field("database_url", &"<REDACTED>")
            .finish()
    }
}

/// Env var names extracted from config, with well-known defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretEnvNames {
    pub github_token_var: String,
    pub freshdesk_token_var: String,
    pub freshdesk_password_var: String,
    pub database_url_var: String,
}

impl SecretEnvNames {
    pub fn from_config_json(config_json: &Value) -> Self {
        SecretEnvNames {
            github_token_var: read_str_at(config_json, "/github/token_env")
                .unwrap_or_else(|| DEFAULT_GITHUB_TOKEN_ENV.to_string()),
            freshdesk_token_var: read_str_at(config_json, "/freshdesk/token_env")
                .unwrap_or_else(|| DEFAULT_FRESHDESK_TOKEN_ENV.to_string()),
            freshdesk_password_var: read_str_at(config_json, "/freshdesk/password_env")
                .unwrap_or_else(|| DEFAULT_FRESHDESK_PASSWORD_ENV.to_string()),
            database_url_var: read_str_at(config_json, "/database/url_env")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL_ENV.to_string()),
        }
    }
}

/// Unset and blank are the same thing.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn require(var_name: &str, what: &str) -> Result<String> {
    match resolve_env(var_name) {
        Some(v) => Ok(v),
        None => bail!(
            "SECRETS_MISSING: required env var '{}' ({}) is not set or empty",
            var_name,
            what
        ),
    }
}

/// Resolve every credential named in `config_json` from the environment.
///
/// Fails on the first missing variable, in the order: GitHub token,
/// Freshdesk token, Freshdesk password, database URL.
pub fn resolve_secrets(config_json: &Value) -> Result<ResolvedSecrets> {
    let names = SecretEnvNames::from_config_json(config_json);

    Ok(ResolvedSecrets {
        github_token: require(&names.github_token_var, "GitHub token")?,
        freshdesk_token: require(&names.freshdesk_token_var, "Freshdesk token")?,
        freshdesk_password: require(&names.freshdesk_password_var, "Freshdesk password")?,
        database_url: require(&names.database_url_var, "database url")?,
    })
}
