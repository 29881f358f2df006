//! Handler for the `/audit` endpoint.

use std::sync::Arc;

use attest_core::{event::AuditEvent, registry::IdentityRegistry};
use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Maximum number of entries, newest first. Default 50.
  pub limit: Option<usize>,
}

/// `GET /audit[?limit=<n>]`
pub async fn list<S>(
  State(registry): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AuditEvent>>, ApiError>
where
  S: IdentityRegistry,
{
  let limit = params.limit.unwrap_or(50);
  Ok(Json(registry.audit_log(limit).await?))
}
