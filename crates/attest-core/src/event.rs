//! Audit events — one per successful mutation, none on failure.
//!
//! Events are appended to a persistent log in the same transaction as the
//! mutation they describe and broadcast to subscribers after commit. The
//! ledger mirror consumes them; so can any other observer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{principal::Principal, record::IdentityRecord};

// ─── AuditAction ─────────────────────────────────────────────────────────────

/// What a successful mutation did. The tag string is the exact text
/// anchored on the ledger mirror and shown to external observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
  #[serde(rename = "Identity Added")]
  Added,
  #[serde(rename = "Identity Updated")]
  Updated,
  #[serde(rename = "Identity Verified")]
  Verified,
  #[serde(rename = "Identity Revoked")]
  Revoked,
  #[serde(rename = "Identity Deleted")]
  Deleted,
}

impl AuditAction {
  /// The tag string external observers see. Must match the `rename`
  /// attributes above.
  pub fn tag(&self) -> &'static str {
    match self {
      Self::Added => "Identity Added",
      Self::Updated => "Identity Updated",
      Self::Verified => "Identity Verified",
      Self::Revoked => "Identity Revoked",
      Self::Deleted => "Identity Deleted",
    }
  }

  /// Inverse of [`AuditAction::tag`], used when decoding stored events.
  pub fn from_tag(tag: &str) -> Option<Self> {
    match tag {
      "Identity Added" => Some(Self::Added),
      "Identity Updated" => Some(Self::Updated),
      "Identity Verified" => Some(Self::Verified),
      "Identity Revoked" => Some(Self::Revoked),
      "Identity Deleted" => Some(Self::Deleted),
      _ => None,
    }
  }
}

impl std::fmt::Display for AuditAction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.tag())
  }
}

// ─── AuditEvent ──────────────────────────────────────────────────────────────

/// A notification emitted after a successful mutation commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
  pub event_id:    Uuid,
  /// The principal that invoked the operation.
  pub caller:      Principal,
  /// The principal whose record changed.
  pub target:      Principal,
  pub action:      AuditAction,
  /// Post-mutation snapshot for Added/Updated — the mirror anchors it.
  /// `None` for verify/revoke/delete, which carry only the action tag.
  pub snapshot:    Option<IdentityRecord>,
  /// Server-assigned; equals the mutation's commit timestamp.
  pub recorded_at: DateTime<Utc>,
}
