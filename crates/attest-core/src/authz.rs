//! Pure authorization decisions for the role-gated policy.
//!
//! The store resolves the caller's role inside the same transaction as the
//! mutation it gates and asks this module for a verdict. Keeping the
//! decision pure keeps it testable without a database.
//!
//! Authorization is checked before record existence: a caller that fails
//! here learns nothing about whether the target record exists.

use crate::{
  Error, Result,
  principal::{Principal, Role},
};

// ─── Operation ───────────────────────────────────────────────────────────────

/// The operations gated by [`authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Add,
  Update,
  Verify,
  Revoke,
  Delete,
  AssignRole,
}

impl Operation {
  /// Human-readable verb used in `Unauthorized` errors.
  pub fn name(&self) -> &'static str {
    match self {
      Self::Add => "add an identity",
      Self::Update => "update an identity",
      Self::Verify => "verify an identity",
      Self::Revoke => "revoke an identity",
      Self::Delete => "delete an identity",
      Self::AssignRole => "assign a role",
    }
  }
}

// ─── Verdict ─────────────────────────────────────────────────────────────────

/// Everything an authorization verdict depends on.
#[derive(Debug, Clone)]
pub struct AuthzContext<'a> {
  pub caller:        &'a Principal,
  pub target:        &'a Principal,
  /// The caller's role at decision time.
  pub caller_role:   Role,
  /// The administrator principal fixed when the registry was created.
  pub administrator: &'a Principal,
}

/// Decide whether the caller may perform `op` against the target's record.
///
/// Add, update, and delete are self-service or Admin-on-behalf-of. Verify
/// is reserved to holders of [`Role::Verifier`], revoke to [`Role::Admin`],
/// and role assignment to the administrator principal.
pub fn authorize(op: Operation, ctx: &AuthzContext<'_>) -> Result<()> {
  let allowed = match op {
    Operation::Add | Operation::Update | Operation::Delete => {
      ctx.caller == ctx.target || ctx.caller_role == Role::Admin
    }
    Operation::Verify => ctx.caller_role == Role::Verifier,
    Operation::Revoke => ctx.caller_role == Role::Admin,
    Operation::AssignRole => ctx.caller == ctx.administrator,
  };

  if allowed {
    Ok(())
  } else {
    Err(Error::Unauthorized {
      principal: ctx.caller.clone(),
      action:    op.name(),
    })
  }
}
