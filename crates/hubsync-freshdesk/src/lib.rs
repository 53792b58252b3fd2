//! hubsync-freshdesk
//!
//! Freshdesk v2 contacts adapter.
//!
//! - create: `POST {tenant}/api/v2/contacts`      -> contact id from the body
//! - update: `PUT  {tenant}/api/v2/contacts/{id}`
//!
//! The tenant base URL comes from a template such as
//! `https://{domain}.freshdesk.com`; the domain is validated before it is
//! spliced into the host. Credentials are HTTP basic auth (token, password).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use hubsync_reconcile::{CrmAdapter, CrmError};
use hubsync_schemas::ProfileFields;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DOMAIN_PLACEHOLDER: &str = "{domain}";

#[derive(Clone)]
pub struct FreshdeskCrm {
    token: String,
    password: String,
    http: reqwest::Client,
    base_url_template: String,
}

impl std::fmt::Debug for FreshdeskCrm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreshdeskCrm")
            .field("token", &"<REDACTED>")
            .field("password", &"<REDACTED>")
            .field("base_url_template", &self.base_url_template)
            .finish()
    }
}

impl FreshdeskCrm {
    pub fn new(
        token: String,
        password: String,
        base_url_template: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build freshdesk http client")?;
        Ok(Self {
            token,
            password,
            http,
            base_url_template,
        })
    }

    fn contacts_url(&self, domain: &str) -> Result<String, CrmError> {
        validate_domain(domain)?;
        let base = self.base_url_template.replace(DOMAIN_PLACEHOLDER, domain);
        Ok(format!("{}/api/v2/contacts", base.trim_end_matches('/')))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<String, CrmError> {
        let resp = req
            .basic_auth(&self.token, Some(&self.password))
            .send()
            .await
            .map_err(|e| CrmError::Transport(format!("freshdesk request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CrmError::Transport(format!("freshdesk response read failed: {e}")))?;

        match status {
            s if s.is_success() => Ok(body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CrmError::Auth(format!(
                "freshdesk status={} body={}",
                status.as_u16(),
                body
            ))),
            _ => Err(CrmError::Http {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

/// Tenant identifiers become a hostname label: `[A-Za-z0-9-]+`, no edge hyphens.
pub fn validate_domain(domain: &str) -> Result<(), CrmError> {
    let ok = !domain.is_empty()
        && domain.len() <= 63
        && !domain.starts_with('-')
        && !domain.ends_with('-')
        && domain.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if ok {
        Ok(())
    } else {
        Err(CrmError::InvalidRequest(format!(
            "invalid freshdesk domain '{domain}'"
        )))
    }
}

/// Contact payload. Freshdesk requires a name, so the username stands in
/// when the profile has none.
#[derive(Debug, Serialize)]
struct ContactBody<'a> {
    name: &'a str,
    email: Option<&'a str>,
    description: Option<&'a str>,
    address: Option<&'a str>,
}

impl<'a> ContactBody<'a> {
    fn from_fields(username: &'a str, fields: &'a ProfileFields) -> Self {
        Self {
            name: fields.display_name.as_deref().unwrap_or(username),
            email: fields.email.as_deref(),
            description: fields.bio.as_deref(),
            address: fields.location.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedContact {
    id: i64,
}

#[async_trait]
impl CrmAdapter for FreshdeskCrm {
    fn crm_name(&self) -> &'static str {
        "freshdesk"
    }

    fn validate_domain(&self, domain: &str) -> Result<(), CrmError> {
        validate_domain(domain)
    }

    async fn create_contact(
        &self,
        domain: &str,
        username: &str,
        fields: &ProfileFields,
    ) -> Result<i64, CrmError> {
        let url = self.contacts_url(domain)?;
        debug!("Freshdesk POST {}", url);

        let body = ContactBody::from_fields(username, fields);
        let raw = self.send(self.http.post(url).json(&body)).await?;

        let created: CreatedContact = serde_json::from_str(&raw)
            .map_err(|e| CrmError::Decode(format!("freshdesk contact json decode failed: {e}")))?;
        Ok(created.id)
    }

    async fn update_contact(
        &self,
        domain: &str,
        contact_id: i64,
        username: &str,
        fields: &ProfileFields,
    ) -> Result<(), CrmError> {
        let url = format!("{}/{}", self.contacts_url(domain)?, contact_id);
        debug!("Freshdesk PUT {}", url);

        let body = ContactBody::from_fields(username, fields);
        self.send(self.http.put(url).json(&body)).await?;
        Ok(())
    }
}
