//! hubsync-github
//!
//! GitHub-backed identity source (`GET /users/{username}`).
//!
//! The token is resolved by the caller (CLI) and passed in; do not log it.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubsync_reconcile::{IdentityError, IdentitySource};
use hubsync_schemas::UserProfile;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

const USER_AGENT: &str = concat!("hubsync/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct GithubIdentitySource {
    token: String,
    http: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for GithubIdentitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubIdentitySource")
            .field("token", &"<REDACTED>")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl GithubIdentitySource {
    pub fn new(token: String, timeout: Duration) -> Result<Self> {
        Self::new_with_base_url(token, "https://api.github.com", timeout)
    }

    pub fn new_with_base_url(token: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid github api base url: {base_url}"))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build github http client")?;
        Ok(Self {
            token,
            http,
            base_url,
        })
    }

    /// `{base}/users/{username}` with the username as one encoded segment.
    fn user_url(&self, username: &str) -> Result<Url, IdentityError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| IdentityError::Transport(format!("base url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["users", username]);
        Ok(url)
    }
}

#[async_trait]
impl IdentitySource for GithubIdentitySource {
    fn source_name(&self) -> &'static str {
        "github"
    }

    async fn fetch(&self, username: &str) -> Result<UserProfile, IdentityError> {
        let url = self.user_url(username)?;
        debug!("GitHub GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| IdentityError::Transport(format!("github request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| IdentityError::Transport(format!("github response read failed: {e}")))?;

        match status {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Err(IdentityError::NotFound(username.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(IdentityError::Auth(format!(
                    "github status={} body={}",
                    status.as_u16(),
                    body
                )))
            }
            _ => {
                return Err(IdentityError::Transport(format!(
                    "github http error status={} body={}",
                    status.as_u16(),
                    body
                )))
            }
        }

        let user: GithubUser = serde_json::from_str(&body)
            .map_err(|e| IdentityError::Decode(format!("github user json decode failed: {e}")))?;
        user.into_profile()
    }
}

/// Subset of the GitHub user object we consume.
#[derive(Debug, Clone, Deserialize)]
struct GithubUser {
    login: String,
    name: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl GithubUser {
    fn into_profile(self) -> Result<UserProfile, IdentityError> {
        if self.login.trim().is_empty() {
            return Err(IdentityError::Decode("github user has empty login".to_string()));
        }
        Ok(UserProfile {
            username: self.login,
            display_name: self.name,
            email: self.email,
            bio: self.bio,
            location: self.location,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base: &str) -> GithubIdentitySource {
        GithubIdentitySource::new_with_base_url("t".to_string(), base, Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn user_url_appends_encoded_segment() {
        let s = source("https://api.github.com");
        assert_eq!(
            s.user_url("octocat").unwrap().as_str(),
            "https://api.github.com/users/octocat"
        );
        let s = source("http://127.0.0.1:8080/api/v3/");
        assert_eq!(
            s.user_url("a/b").unwrap().as_str(),
            "http://127.0.0.1:8080/api/v3/users/a%2Fb"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let s = GithubIdentitySource::new_with_base_url(
            "ghp_secret_value".to_string(),
            "https://api.github.com",
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!format!("{s:?}").contains("ghp_secret_value"));
    }

    #[test]
    fn empty_login_is_a_decode_error() {
        let u: GithubUser = serde_json::from_str(r#"{"login":""}"#).unwrap();
        assert!(matches!(u.into_profile(), Err(IdentityError::Decode(_))));
    }
}
