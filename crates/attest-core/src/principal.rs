//! Principal — the authenticated account identifier attributed to a call —
//! and the role that gates what it may do to other principals' records.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result};

// ─── Principal ───────────────────────────────────────────────────────────────

/// An opaque account identifier supplied by the execution environment.
///
/// The registry never authenticates principals; it only authorizes the
/// identifier it is handed. Construction rejects blank identifiers so a
/// missing caller can never alias a real account.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
  pub fn new(id: impl Into<String>) -> Result<Self> {
    let id = id.into();
    if id.trim().is_empty() {
      return Err(Error::InvalidInput("principal must be non-empty".into()));
    }
    Ok(Self(id))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for Principal {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

impl std::str::FromStr for Principal {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::new(s) }
}

// ─── Role ────────────────────────────────────────────────────────────────────

/// Authorization tag controlling which operations a principal may invoke on
/// another principal's record. Any principal never explicitly assigned a
/// role holds [`Role::Unassigned`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  /// Grants nothing beyond self-service on the principal's own record.
  #[default]
  Unassigned,
  /// May manage records on behalf of any principal and revoke verification.
  Admin,
  /// May mark existing records as verified.
  Verifier,
}
