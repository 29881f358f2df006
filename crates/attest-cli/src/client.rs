//! Async HTTP client wrapping the attest JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use attest_core::{
  event::AuditEvent, principal::Role, record::IdentityRecord,
};
use reqwest::{Client, Method, Response};
use serde::Deserialize;
use serde_json::json;

/// Header carrying the caller principal; must match the server.
const PRINCIPAL_HEADER: &str = "x-attest-principal";

/// Connection settings for the attest API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url:  String,
  /// Principal every request is attributed to.
  pub principal: String,
}

/// Async HTTP client for the attest JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

#[derive(Debug, Deserialize)]
struct RoleBody {
  role: Role,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
    self
      .client
      .request(method, self.url(path))
      .header(PRINCIPAL_HEADER, &self.config.principal)
  }

  /// Surface the server's `{"error": …}` body on non-success statuses.
  async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| {
        v.get("error").and_then(|e| e.as_str()).map(str::to_owned)
      })
      .unwrap_or_else(|| status.to_string());
    Err(anyhow!("{message}"))
  }

  // ── Identities ────────────────────────────────────────────────────────────

  /// `GET /identities/:principal`
  pub async fn get_identity(&self, target: &str) -> Result<IdentityRecord> {
    let resp = self
      .request(Method::GET, &format!("/identities/{target}"))
      .send()
      .await
      .context("GET /identities failed")?;
    Self::check(resp)
      .await?
      .json()
      .await
      .context("deserialising identity")
  }

  /// `POST /identities/:principal`
  pub async fn add_identity(
    &self,
    target: &str,
    name: &str,
    email: &str,
  ) -> Result<AuditEvent> {
    let resp = self
      .request(Method::POST, &format!("/identities/{target}"))
      .json(&json!({ "name": name, "email": email }))
      .send()
      .await
      .context("POST /identities failed")?;
    Self::check(resp)
      .await?
      .json()
      .await
      .context("deserialising audit event")
  }

  /// `PUT /identities/:principal`
  pub async fn update_identity(
    &self,
    target: &str,
    name: &str,
    email: &str,
  ) -> Result<AuditEvent> {
    let resp = self
      .request(Method::PUT, &format!("/identities/{target}"))
      .json(&json!({ "name": name, "email": email }))
      .send()
      .await
      .context("PUT /identities failed")?;
    Self::check(resp)
      .await?
      .json()
      .await
      .context("deserialising audit event")
  }

  /// `POST /identities/:principal/verify`
  pub async fn verify_identity(&self, target: &str) -> Result<AuditEvent> {
    let resp = self
      .request(Method::POST, &format!("/identities/{target}/verify"))
      .send()
      .await
      .context("POST /verify failed")?;
    Self::check(resp)
      .await?
      .json()
      .await
      .context("deserialising audit event")
  }

  /// `POST /identities/:principal/revoke`
  pub async fn revoke_identity(&self, target: &str) -> Result<AuditEvent> {
    let resp = self
      .request(Method::POST, &format!("/identities/{target}/revoke"))
      .send()
      .await
      .context("POST /revoke failed")?;
    Self::check(resp)
      .await?
      .json()
      .await
      .context("deserialising audit event")
  }

  /// `DELETE /identities/:principal`
  pub async fn delete_identity(&self, target: &str) -> Result<()> {
    let resp = self
      .request(Method::DELETE, &format!("/identities/{target}"))
      .send()
      .await
      .context("DELETE /identities failed")?;
    Self::check(resp).await?;
    Ok(())
  }

  // ── Roles ─────────────────────────────────────────────────────────────────

  /// `GET /roles/:principal`
  pub async fn role_of(&self, principal: &str) -> Result<Role> {
    let resp = self
      .request(Method::GET, &format!("/roles/{principal}"))
      .send()
      .await
      .context("GET /roles failed")?;
    let body: RoleBody = Self::check(resp)
      .await?
      .json()
      .await
      .context("deserialising role")?;
    Ok(body.role)
  }

  /// `PUT /roles/:principal`
  pub async fn assign_role(
    &self,
    principal: &str,
    role: Role,
  ) -> Result<Role> {
    let resp = self
      .request(Method::PUT, &format!("/roles/{principal}"))
      .json(&json!({ "role": role }))
      .send()
      .await
      .context("PUT /roles failed")?;
    let body: RoleBody = Self::check(resp)
      .await?
      .json()
      .await
      .context("deserialising role")?;
    Ok(body.role)
  }

  // ── Audit ─────────────────────────────────────────────────────────────────

  /// `GET /audit?limit=<n>`
  pub async fn audit_log(&self, limit: usize) -> Result<Vec<AuditEvent>> {
    let resp = self
      .request(Method::GET, "/audit")
      .query(&[("limit", limit.to_string())])
      .send()
      .await
      .context("GET /audit failed")?;
    Self::check(resp)
      .await?
      .json()
      .await
      .context("deserialising audit log")
  }
}
