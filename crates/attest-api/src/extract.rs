//! Caller-principal extraction.
//!
//! Every mutating request is attributed to the principal named in the
//! [`PRINCIPAL_HEADER`] header. The execution environment in front of
//! this server (reverse proxy, gateway, wallet-signature check) is
//! responsible for authenticating that header; the registry only
//! authorizes it.

use attest_core::principal::Principal;
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Header carrying the authenticated caller principal.
pub const PRINCIPAL_HEADER: &str = "x-attest-principal";

/// The principal the execution environment attributed to this request.
pub struct CallerPrincipal(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for CallerPrincipal {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let raw = parts
      .headers
      .get(PRINCIPAL_HEADER)
      .and_then(|v| v.to_str().ok())
      .ok_or_else(|| {
        ApiError::BadRequest(format!("missing {PRINCIPAL_HEADER} header"))
      })?;

    let principal =
      Principal::new(raw).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Self(principal))
  }
}

/// Parse a principal out of a path segment.
pub fn parse_principal(raw: &str) -> Result<Principal, ApiError> {
  Principal::new(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}
