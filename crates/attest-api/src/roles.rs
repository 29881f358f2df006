//! Handlers for `/roles` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/roles/:principal` | Always 200; unassigned principals read back `"unassigned"` |
//! | `PUT`  | `/roles/:principal` | Body: `{"role":"admin"}`; administrator only |

use std::sync::Arc;

use attest_core::{principal::Role, registry::IdentityRegistry};
use axum::{
  Json,
  extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::{
  error::ApiError,
  extract::{CallerPrincipal, parse_principal},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleBody {
  pub role: Role,
}

/// `GET /roles/:principal`
pub async fn get_one<S>(
  State(registry): State<Arc<S>>,
  Path(principal): Path<String>,
) -> Result<Json<RoleBody>, ApiError>
where
  S: IdentityRegistry,
{
  let principal = parse_principal(&principal)?;
  let role = registry.role_of(&principal).await?;
  Ok(Json(RoleBody { role }))
}

/// `PUT /roles/:principal` — body: `{"role":"verifier"}`
pub async fn assign<S>(
  State(registry): State<Arc<S>>,
  Path(principal): Path<String>,
  caller: CallerPrincipal,
  Json(body): Json<RoleBody>,
) -> Result<Json<RoleBody>, ApiError>
where
  S: IdentityRegistry,
{
  let principal = parse_principal(&principal)?;
  registry.assign_role(&caller.0, &principal, body.role).await?;
  Ok(Json(RoleBody { role: body.role }))
}
