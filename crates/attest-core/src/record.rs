//! Identity records — the value the registry stores per principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, principal::Principal};

// ─── IdentityRecord ──────────────────────────────────────────────────────────

/// Snapshot of one principal's identity entry.
///
/// `exists` is the predicate every precondition checks. A deleted record
/// keeps its row with the fields reset rather than disappearing, so the
/// storage layer can tell "deleted" apart from "never registered" while the
/// registry exposes both as `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
  pub principal:   Principal,
  pub name:        String,
  pub email:       String,
  pub is_verified: bool,
  pub exists:      bool,
  /// Server-assigned when the record is created; a delete-then-recreate
  /// starts a fresh one.
  pub recorded_at: DateTime<Utc>,
  /// Server-assigned on every successful mutation.
  pub updated_at:  DateTime<Utc>,
}

// ─── NewIdentity ─────────────────────────────────────────────────────────────

/// Validated input to add/update. Construction is the single place the
/// name/email rules are enforced, so a `NewIdentity` in hand is always
/// well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
  name:  String,
  email: String,
}

impl NewIdentity {
  pub fn new(
    name: impl Into<String>,
    email: impl Into<String>,
  ) -> Result<Self> {
    let name = name.into();
    let email = email.into();

    if name.trim().is_empty() {
      return Err(Error::InvalidInput("name must be non-empty".into()));
    }
    if email.trim().is_empty() {
      return Err(Error::InvalidInput("email must be non-empty".into()));
    }
    if !email.contains('@') {
      return Err(Error::InvalidInput(format!(
        "email {email:?} is missing an '@'"
      )));
    }

    Ok(Self { name, email })
  }

  pub fn name(&self) -> &str { &self.name }

  pub fn email(&self) -> &str { &self.email }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_wellformed_input() {
    let input = NewIdentity::new("Alice", "alice@example.com").unwrap();
    assert_eq!(input.name(), "Alice");
    assert_eq!(input.email(), "alice@example.com");
  }

  #[test]
  fn rejects_blank_name() {
    assert!(matches!(
      NewIdentity::new("   ", "alice@example.com"),
      Err(Error::InvalidInput(_))
    ));
  }

  #[test]
  fn rejects_blank_or_malformed_email() {
    assert!(matches!(
      NewIdentity::new("Alice", ""),
      Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
      NewIdentity::new("Alice", "alice.example.com"),
      Err(Error::InvalidInput(_))
    ));
  }
}
