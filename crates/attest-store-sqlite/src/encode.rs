//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, roles as their lowercase
//! names, audit actions as their tag strings, snapshots as compact JSON.
//! Decoding failures have no domain meaning and fold into
//! [`attest_core::Error::Storage`].

use attest_core::{
  Error, Result,
  event::{AuditAction, AuditEvent},
  principal::{Principal, Role},
  record::IdentityRecord,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Storage(format!("bad timestamp {s:?}: {e}")))
}

// ─── Role ────────────────────────────────────────────────────────────────────

pub fn encode_role(role: Role) -> String { role.to_string() }

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse()
    .map_err(|_| Error::Storage(format!("unknown role: {s:?}")))
}

// ─── Principal ───────────────────────────────────────────────────────────────

pub fn decode_principal(s: &str) -> Result<Principal> {
  Principal::new(s).map_err(|e| Error::Storage(format!("bad principal: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `identities` row.
pub struct RawIdentity {
  pub principal:   String,
  pub name:        String,
  pub email:       String,
  pub is_verified: bool,
  pub live:        bool,
  pub recorded_at: String,
  pub updated_at:  String,
}

impl RawIdentity {
  pub fn into_record(self) -> Result<IdentityRecord> {
    Ok(IdentityRecord {
      principal:   decode_principal(&self.principal)?,
      name:        self.name,
      email:       self.email,
      is_verified: self.is_verified,
      exists:      self.live,
      recorded_at: decode_dt(&self.recorded_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from an `audit_log` row.
pub struct RawAuditEvent {
  pub event_id:    String,
  pub caller:      String,
  pub target:      String,
  pub action:      String,
  pub snapshot:    Option<String>,
  pub recorded_at: String,
}

impl RawAuditEvent {
  pub fn into_event(self) -> Result<AuditEvent> {
    let event_id = Uuid::parse_str(&self.event_id)
      .map_err(|e| Error::Storage(format!("bad event id: {e}")))?;
    let action = AuditAction::from_tag(&self.action)
      .ok_or_else(|| Error::Storage(format!("unknown audit action: {:?}", self.action)))?;
    let snapshot = self
      .snapshot
      .as_deref()
      .map(serde_json::from_str)
      .transpose()?;

    Ok(AuditEvent {
      event_id,
      caller: decode_principal(&self.caller)?,
      target: decode_principal(&self.target)?,
      action,
      snapshot,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
