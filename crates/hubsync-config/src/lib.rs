//! hubsync-config
//!
//! Layered YAML configuration.
//!
//! - Files are merged in order; later files override earlier ones key by key.
//! - The merged document is hashed (sha256 of canonical JSON) so a run can be
//!   attributed to an exact configuration.
//! - Config stores env var NAMES for credentials, never values. Literal
//!   secrets are rejected at load time; values are resolved once in
//!   [`secrets::resolve_secrets`].

pub mod secrets;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs;
use std::time::Duration;

/// Known secret-like prefixes. Any leaf string starting with one of these
/// aborts loading with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "ghp_",        // GitHub PAT (classic)
    "gho_",        // GitHub OAuth
    "ghs_",        // GitHub app installation token
    "github_pat_", // GitHub fine-grained PAT
    "-----BEGIN",  // PEM private keys
    "postgres://", // connection strings carry passwords
    "postgresql://",
    "sk-",
    "AKIA",
];

pub const DEFAULT_GITHUB_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_FRESHDESK_BASE_URL_TEMPLATE: &str = "https://{domain}.freshdesk.com";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; treat it as "no overrides".
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Typed view of the settings the process actually reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub github_api_base_url: String,
    /// Must contain `{domain}`, or be a fixed URL (test servers).
    pub freshdesk_base_url_template: String,
    pub database_max_connections: u32,
    pub http_timeout: Duration,
}

impl Settings {
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let github_api_base_url = read_str_at(cfg, "/github/api_base_url")
            .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE_URL.to_string());
        let freshdesk_base_url_template = read_str_at(cfg, "/freshdesk/base_url_template")
            .unwrap_or_else(|| DEFAULT_FRESHDESK_BASE_URL_TEMPLATE.to_string());

        let database_max_connections = match cfg.pointer("/database/max_connections") {
            None | Some(Value::Null) => DEFAULT_MAX_CONNECTIONS,
            Some(v) => v
                .as_u64()
                .filter(|n| *n > 0 && *n <= u32::MAX as u64)
                .map(|n| n as u32)
                .context("database.max_connections must be a positive integer")?,
        };

        let timeout_secs = match cfg.pointer("/http/timeout_secs") {
            None | Some(Value::Null) => DEFAULT_HTTP_TIMEOUT_SECS,
            Some(v) => v
                .as_u64()
                .filter(|n| *n > 0)
                .context("http.timeout_secs must be a positive integer")?,
        };

        for (key, url) in [
            ("github.api_base_url", &github_api_base_url),
            ("freshdesk.base_url_template", &freshdesk_base_url_template),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("{key} must be an http(s) URL (got '{url}')");
            }
        }

        Ok(Settings {
            github_api_base_url,
            freshdesk_base_url_template,
            database_max_connections,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Read a non-empty string at `pointer`. Blank strings count as absent.
pub(crate) fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, k.replace('~', "~0").replace('/', "~1"));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                collect_leaf_pointers(vv, &format!("{prefix}/{i}"), out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_override_earlier() {
        let base = "github:\n  api_base_url: https://api.github.com\nhttp:\n  timeout_secs: 30\n";
        let local = "http:\n  timeout_secs: 5\n";
        let loaded = load_layered_yaml_from_strings(&[base, local]).unwrap();
        let s = Settings::from_config_json(&loaded.config_json).unwrap();
        assert_eq!(s.http_timeout, Duration::from_secs(5));
        assert_eq!(s.github_api_base_url, "https://api.github.com");
    }

    #[test]
    fn empty_config_yields_defaults() {
        let loaded = load_layered_yaml_from_strings(&[]).unwrap();
        let s = Settings::from_config_json(&loaded.config_json).unwrap();
        assert_eq!(s.freshdesk_base_url_template, DEFAULT_FRESHDESK_BASE_URL_TEMPLATE);
        assert_eq!(s.database_max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let loaded = load_layered_yaml_from_strings(&["http:\n  timeout_secs: 0\n"]).unwrap();
        assert!(Settings::from_config_json(&loaded.config_json).is_err());
    }

    #[test]
    fn non_http_url_is_rejected() {
        let loaded =
            load_layered_yaml_from_strings(&["github:\n  api_base_url: ftp://example.com\n"])
                .unwrap();
        let err = Settings::from_config_json(&loaded.config_json).unwrap_err();
        assert!(err.to_string().contains("github.api_base_url"));
    }
}
