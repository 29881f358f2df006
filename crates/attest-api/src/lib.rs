//! JSON REST API for the Attest identity registry.
//!
//! Exposes an axum [`Router`] backed by any
//! [`attest_core::registry::IdentityRegistry`]. The caller principal
//! arrives in the `x-attest-principal` header; authenticating that
//! header (reverse proxy, gateway, wallet-signature check) is the
//! deployment's responsibility — the registry only authorizes. TLS and
//! transport concerns are likewise the caller's.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = attest_api::api_router(registry.clone());
//! ```

pub mod audit;
pub mod error;
pub mod extract;
pub mod forward;
pub mod identities;
pub mod roles;

use std::{path::PathBuf, sync::Arc};

use attest_core::registry::IdentityRegistry;
use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;

pub use error::ApiError;
pub use extract::{CallerPrincipal, PRINCIPAL_HEADER};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub store_path:    PathBuf,
  /// The principal allowed to assign roles; fixed into new stores.
  pub administrator: String,
  /// Ledger-mirror settings; omit to run without anchoring.
  pub mirror:        Option<MirrorSettings>,
}

/// Ledger-mirror connection settings.
#[derive(Deserialize, Clone)]
pub struct MirrorSettings {
  pub endpoint:         String,
  pub account:          String,
  pub signing_seed:     String,
  pub max_retries:      Option<u32>,
  pub retry_backoff_ms: Option<u64>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `registry`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S>(registry: Arc<S>) -> Router<()>
where
  S: IdentityRegistry + 'static,
{
  Router::new()
    .route(
      "/identities/{principal}",
      get(identities::get_one::<S>)
        .post(identities::create::<S>)
        .put(identities::update::<S>)
        .delete(identities::remove::<S>),
    )
    .route(
      "/identities/{principal}/verify",
      post(identities::verify::<S>),
    )
    .route(
      "/identities/{principal}/revoke",
      post(identities::revoke::<S>),
    )
    .route(
      "/roles/{principal}",
      get(roles::get_one::<S>).put(roles::assign::<S>),
    )
    .route("/audit", get(audit::list::<S>))
    .with_state(registry)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use attest_core::{
    principal::{Principal, Role},
    registry::IdentityRegistry as _,
  };
  use attest_store_sqlite::SqliteRegistry;
  use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::json;
  use tower::ServiceExt as _;

  use crate::{PRINCIPAL_HEADER, api_router};

  /// Registry with `verifier` holding Verifier, behind a router.
  async fn app() -> Router {
    let registry =
      SqliteRegistry::open_in_memory(Principal::new("deployer").unwrap())
        .await
        .unwrap();
    registry
      .assign_role(
        &Principal::new("deployer").unwrap(),
        &Principal::new("verifier").unwrap(),
        Role::Verifier,
      )
      .await
      .unwrap();
    api_router(Arc::new(registry))
  }

  fn req(
    method: &str,
    uri: &str,
    caller: Option<&str>,
    body: Option<serde_json::Value>,
  ) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
      builder = builder.header(PRINCIPAL_HEADER, caller);
    }
    match body {
      Some(value) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    }
  }

  async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[tokio::test]
  async fn create_then_get() {
    let app = app().await;

    let response = app
      .clone()
      .oneshot(req(
        "POST",
        "/identities/alice",
        Some("alice"),
        Some(json!({"name": "Alice", "email": "alice@example.com"})),
      ))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let event = body_json(response).await;
    assert_eq!(event["action"], "Identity Added");
    assert_eq!(event["snapshot"]["name"], "Alice");

    let response = app
      .oneshot(req("GET", "/identities/alice", None, None))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = body_json(response).await;
    assert_eq!(record["email"], "alice@example.com");
    assert_eq!(record["is_verified"], false);
    assert_eq!(record["exists"], true);
  }

  #[tokio::test]
  async fn duplicate_create_conflicts() {
    let app = app().await;
    let body = json!({"name": "Alice", "email": "alice@example.com"});

    let response = app
      .clone()
      .oneshot(req("POST", "/identities/alice", Some("alice"), Some(body.clone())))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
      .oneshot(req("POST", "/identities/alice", Some("alice"), Some(body)))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn get_missing_is_404() {
    let app = app().await;
    let response = app
      .oneshot(req("GET", "/identities/nobody", None, None))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn mutation_without_principal_header_is_400() {
    let app = app().await;
    let response = app
      .oneshot(req(
        "POST",
        "/identities/alice",
        None,
        Some(json!({"name": "Alice", "email": "alice@example.com"})),
      ))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn malformed_email_is_422() {
    let app = app().await;
    let response = app
      .oneshot(req(
        "POST",
        "/identities/alice",
        Some("alice"),
        Some(json!({"name": "Alice", "email": "not-an-email"})),
      ))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
  }

  #[tokio::test]
  async fn verify_is_role_gated() {
    let app = app().await;
    app
      .clone()
      .oneshot(req(
        "POST",
        "/identities/alice",
        Some("alice"),
        Some(json!({"name": "Alice", "email": "alice@example.com"})),
      ))
      .await
      .unwrap();

    let response = app
      .clone()
      .oneshot(req("POST", "/identities/alice/verify", Some("alice"), None))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
      .oneshot(req(
        "POST",
        "/identities/alice/verify",
        Some("verifier"),
        None,
      ))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let event = body_json(response).await;
    assert_eq!(event["action"], "Identity Verified");
  }

  #[tokio::test]
  async fn delete_returns_204_and_clears_record() {
    let app = app().await;
    app
      .clone()
      .oneshot(req(
        "POST",
        "/identities/alice",
        Some("alice"),
        Some(json!({"name": "Alice", "email": "alice@example.com"})),
      ))
      .await
      .unwrap();

    let response = app
      .clone()
      .oneshot(req("DELETE", "/identities/alice", Some("alice"), None))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
      .oneshot(req("GET", "/identities/alice", None, None))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn roles_roundtrip_and_gating() {
    let app = app().await;

    // Only the administrator may assign.
    let response = app
      .clone()
      .oneshot(req(
        "PUT",
        "/roles/bob",
        Some("bob"),
        Some(json!({"role": "admin"})),
      ))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
      .clone()
      .oneshot(req(
        "PUT",
        "/roles/bob",
        Some("deployer"),
        Some(json!({"role": "admin"})),
      ))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
      .oneshot(req("GET", "/roles/bob", None, None))
      .await
      .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["role"], "admin");
  }

  #[tokio::test]
  async fn audit_endpoint_lists_events_newest_first() {
    let app = app().await;
    app
      .clone()
      .oneshot(req(
        "POST",
        "/identities/alice",
        Some("alice"),
        Some(json!({"name": "Alice", "email": "alice@example.com"})),
      ))
      .await
      .unwrap();
    app
      .clone()
      .oneshot(req(
        "POST",
        "/identities/alice/verify",
        Some("verifier"),
        None,
      ))
      .await
      .unwrap();

    let response = app
      .oneshot(req("GET", "/audit?limit=10", None, None))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let events = body_json(response).await;
    assert_eq!(events[0]["action"], "Identity Verified");
    assert_eq!(events[1]["action"], "Identity Added");
  }
}
