//! Handlers for `/identities` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/identities/:principal` | 404 if no live record |
//! | `POST`   | `/identities/:principal` | Body: `{"name":…,"email":…}`; 201 + audit event |
//! | `PUT`    | `/identities/:principal` | Same body; 200 + audit event |
//! | `POST`   | `/identities/:principal/verify` | Verifier role required |
//! | `POST`   | `/identities/:principal/revoke` | Admin role required |
//! | `DELETE` | `/identities/:principal` | 204 |
//!
//! Every mutating route reads the caller from the principal header.

use std::sync::Arc;

use attest_core::{
  event::AuditEvent,
  record::{IdentityRecord, NewIdentity},
  registry::IdentityRegistry,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::{
  error::ApiError,
  extract::{CallerPrincipal, parse_principal},
};

#[derive(Debug, Deserialize)]
pub struct IdentityBody {
  pub name:  String,
  pub email: String,
}

/// `GET /identities/:principal`
pub async fn get_one<S>(
  State(registry): State<Arc<S>>,
  Path(principal): Path<String>,
) -> Result<Json<IdentityRecord>, ApiError>
where
  S: IdentityRegistry,
{
  let target = parse_principal(&principal)?;
  Ok(Json(registry.get_identity(&target).await?))
}

/// `POST /identities/:principal` — body: `{"name":"…","email":"…"}`
pub async fn create<S>(
  State(registry): State<Arc<S>>,
  Path(principal): Path<String>,
  caller: CallerPrincipal,
  Json(body): Json<IdentityBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IdentityRegistry,
{
  let target = parse_principal(&principal)?;
  let input = NewIdentity::new(body.name, body.email)?;
  let event = registry.add_identity(&caller.0, &target, input).await?;
  Ok((StatusCode::CREATED, Json(event)))
}

/// `PUT /identities/:principal` — body: `{"name":"…","email":"…"}`
pub async fn update<S>(
  State(registry): State<Arc<S>>,
  Path(principal): Path<String>,
  caller: CallerPrincipal,
  Json(body): Json<IdentityBody>,
) -> Result<Json<AuditEvent>, ApiError>
where
  S: IdentityRegistry,
{
  let target = parse_principal(&principal)?;
  let input = NewIdentity::new(body.name, body.email)?;
  Ok(Json(registry.update_identity(&caller.0, &target, input).await?))
}

/// `POST /identities/:principal/verify`
pub async fn verify<S>(
  State(registry): State<Arc<S>>,
  Path(principal): Path<String>,
  caller: CallerPrincipal,
) -> Result<Json<AuditEvent>, ApiError>
where
  S: IdentityRegistry,
{
  let target = parse_principal(&principal)?;
  Ok(Json(registry.verify_identity(&caller.0, &target).await?))
}

/// `POST /identities/:principal/revoke`
pub async fn revoke<S>(
  State(registry): State<Arc<S>>,
  Path(principal): Path<String>,
  caller: CallerPrincipal,
) -> Result<Json<AuditEvent>, ApiError>
where
  S: IdentityRegistry,
{
  let target = parse_principal(&principal)?;
  Ok(Json(registry.revoke_identity(&caller.0, &target).await?))
}

/// `DELETE /identities/:principal`
pub async fn remove<S>(
  State(registry): State<Arc<S>>,
  Path(principal): Path<String>,
  caller: CallerPrincipal,
) -> Result<impl IntoResponse, ApiError>
where
  S: IdentityRegistry,
{
  let target = parse_principal(&principal)?;
  registry.delete_identity(&caller.0, &target).await?;
  Ok(StatusCode::NO_CONTENT)
}
