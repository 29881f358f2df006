//! The `IdentityRegistry` trait — the registry's operation contract.
//!
//! Implemented by storage backends (e.g. `attest-store-sqlite`). Higher
//! layers (`attest-api`, `attest-cli`) depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use crate::{
  Error,
  event::AuditEvent,
  principal::{Principal, Role},
  record::{IdentityRecord, NewIdentity},
};

/// Abstraction over an identity registry backend.
///
/// Every mutating operation is atomic with respect to its own
/// authorization check, precondition check, and effect: it commits fully
/// or fails with the registry state unchanged. Authorization is checked
/// before record existence. Each successful mutation appends exactly one
/// [`AuditEvent`] to the audit log; failed calls append none.
///
/// Errors are the fixed taxonomy in [`crate::error::Error`] — backends
/// fold their internal failures into [`Error::Storage`].
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait IdentityRegistry: Send + Sync {
  // ── Mutations ─────────────────────────────────────────────────────────

  /// Create the target's record with `is_verified = false`.
  ///
  /// Fails with `AlreadyExists` if a live record is present. A record
  /// deleted earlier may be recreated; the new record starts fresh.
  fn add_identity<'a>(
    &'a self,
    caller: &'a Principal,
    target: &'a Principal,
    input: NewIdentity,
  ) -> impl Future<Output = Result<AuditEvent, Error>> + Send + 'a;

  /// Overwrite the target's name and email. Verification status is
  /// unchanged. Fails with `NotFound` if no live record exists.
  fn update_identity<'a>(
    &'a self,
    caller: &'a Principal,
    target: &'a Principal,
    input: NewIdentity,
  ) -> impl Future<Output = Result<AuditEvent, Error>> + Send + 'a;

  /// Mark the target's record verified. Verifying an already-verified
  /// record is a no-op success and is still audited.
  fn verify_identity<'a>(
    &'a self,
    caller: &'a Principal,
    target: &'a Principal,
  ) -> impl Future<Output = Result<AuditEvent, Error>> + Send + 'a;

  /// Clear the target's verification flag; the record is otherwise
  /// intact.
  fn revoke_identity<'a>(
    &'a self,
    caller: &'a Principal,
    target: &'a Principal,
  ) -> impl Future<Output = Result<AuditEvent, Error>> + Send + 'a;

  /// Reset the target's record to inert defaults (`exists = false`,
  /// `is_verified = false`). A subsequent add may recreate it.
  fn delete_identity<'a>(
    &'a self,
    caller: &'a Principal,
    target: &'a Principal,
  ) -> impl Future<Output = Result<AuditEvent, Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Snapshot of the target's live record. Strict: fails with `NotFound`
  /// when no live record exists.
  fn get_identity<'a>(
    &'a self,
    target: &'a Principal,
  ) -> impl Future<Output = Result<IdentityRecord, Error>> + Send + 'a;

  // ── Roles ─────────────────────────────────────────────────────────────

  /// Set a principal's role. Reserved to the administrator principal
  /// fixed when the registry was created. Not audited — role assignment
  /// is registry administration, not an identity mutation.
  fn assign_role<'a>(
    &'a self,
    caller: &'a Principal,
    principal: &'a Principal,
    role: Role,
  ) -> impl Future<Output = Result<(), Error>> + Send + 'a;

  /// A principal's current role; `Unassigned` when never set.
  fn role_of<'a>(
    &'a self,
    principal: &'a Principal,
  ) -> impl Future<Output = Result<Role, Error>> + Send + 'a;

  // ── Audit ─────────────────────────────────────────────────────────────

  /// The most recent audit entries, newest first.
  fn audit_log(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<AuditEvent>, Error>> + Send + '_;
}
