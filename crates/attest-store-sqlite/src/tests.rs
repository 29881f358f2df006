//! Integration tests for `SqliteRegistry` against an in-memory database.

use attest_core::{
  Error,
  event::AuditAction,
  principal::{Principal, Role},
  record::NewIdentity,
  registry::IdentityRegistry,
};
use tokio::sync::broadcast::error::TryRecvError;

use crate::SqliteRegistry;

fn p(id: &str) -> Principal { Principal::new(id).unwrap() }

fn alice_input() -> NewIdentity {
  NewIdentity::new("Alice", "alice@example.com").unwrap()
}

async fn registry() -> SqliteRegistry {
  SqliteRegistry::open_in_memory(p("deployer"))
    .await
    .expect("in-memory registry")
}

/// Registry with `verifier` holding Verifier and `ops` holding Admin.
async fn staffed_registry() -> SqliteRegistry {
  let r = registry().await;
  r.assign_role(&p("deployer"), &p("verifier"), Role::Verifier)
    .await
    .unwrap();
  r.assign_role(&p("deployer"), &p("ops"), Role::Admin)
    .await
    .unwrap();
  r
}

// ─── Add / get ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_round_trip() {
  let r = registry().await;
  let alice = p("alice");

  r.add_identity(&alice, &alice, alice_input()).await.unwrap();

  let record = r.get_identity(&alice).await.unwrap();
  assert_eq!(record.principal, alice);
  assert_eq!(record.name, "Alice");
  assert_eq!(record.email, "alice@example.com");
  assert!(!record.is_verified);
  assert!(record.exists);
}

#[tokio::test]
async fn add_over_live_record_fails_and_preserves_it() {
  let r = registry().await;
  let alice = p("alice");

  r.add_identity(&alice, &alice, alice_input()).await.unwrap();

  let second = NewIdentity::new("Mallory", "mallory@example.com").unwrap();
  let err = r.add_identity(&alice, &alice, second).await.unwrap_err();
  assert!(matches!(err, Error::AlreadyExists(ref who) if *who == alice));

  // The first call's fields survive the rejected second call.
  let record = r.get_identity(&alice).await.unwrap();
  assert_eq!(record.name, "Alice");
  assert_eq!(record.email, "alice@example.com");
}

#[tokio::test]
async fn get_missing_identity_fails_not_found() {
  let r = registry().await;
  let err = r.get_identity(&p("nobody")).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn add_on_behalf_requires_admin() {
  let r = staffed_registry().await;
  let bob = p("bob");

  // A bystander may not register someone else.
  let err = r
    .add_identity(&p("alice"), &bob, alice_input())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized { .. }));

  // Admin may.
  r.add_identity(&p("ops"), &bob, NewIdentity::new("Bob", "bob@x.com").unwrap())
    .await
    .unwrap();
  assert_eq!(r.get_identity(&bob).await.unwrap().name, "Bob");
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_overwrites_fields_and_keeps_verification() {
  let r = staffed_registry().await;
  let alice = p("alice");

  r.add_identity(&alice, &alice, alice_input()).await.unwrap();
  r.verify_identity(&p("verifier"), &alice).await.unwrap();

  let updated =
    NewIdentity::new("Alice Updated", "aliceupdated@example.com").unwrap();
  r.update_identity(&alice, &alice, updated).await.unwrap();

  let record = r.get_identity(&alice).await.unwrap();
  assert_eq!(record.name, "Alice Updated");
  assert_eq!(record.email, "aliceupdated@example.com");
  assert!(record.is_verified, "update must not touch verification");
}

#[tokio::test]
async fn mutations_before_add_fail_not_found() {
  let r = staffed_registry().await;
  let ghost = p("ghost");

  let err = r
    .update_identity(&ghost, &ghost, alice_input())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));

  let err = r.verify_identity(&p("verifier"), &ghost).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));

  let err = r.revoke_identity(&p("ops"), &ghost).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));

  let err = r.delete_identity(&ghost, &ghost).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

// ─── Verify / revoke ─────────────────────────────────────────────────────────

#[tokio::test]
async fn verify_requires_verifier_role() {
  let r = staffed_registry().await;
  let alice = p("alice");
  r.add_identity(&alice, &alice, alice_input()).await.unwrap();

  // Not self-service, and not implied by Admin.
  let err = r.verify_identity(&alice, &alice).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized { .. }));
  let err = r.verify_identity(&p("ops"), &alice).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized { .. }));

  r.verify_identity(&p("verifier"), &alice).await.unwrap();
  assert!(r.get_identity(&alice).await.unwrap().is_verified);
}

#[tokio::test]
async fn verify_twice_is_a_no_op_success() {
  let r = staffed_registry().await;
  let alice = p("alice");
  r.add_identity(&alice, &alice, alice_input()).await.unwrap();

  r.verify_identity(&p("verifier"), &alice).await.unwrap();
  r.verify_identity(&p("verifier"), &alice).await.unwrap();

  assert!(r.get_identity(&alice).await.unwrap().is_verified);
}

#[tokio::test]
async fn revoke_clears_flag_and_keeps_record() {
  let r = staffed_registry().await;
  let alice = p("alice");
  r.add_identity(&alice, &alice, alice_input()).await.unwrap();
  r.verify_identity(&p("verifier"), &alice).await.unwrap();

  r.revoke_identity(&p("ops"), &alice).await.unwrap();

  let record = r.get_identity(&alice).await.unwrap();
  assert!(!record.is_verified);
  assert!(record.exists);
  assert_eq!(record.name, "Alice");
}

#[tokio::test]
async fn revoke_requires_admin_role() {
  let r = staffed_registry().await;
  let alice = p("alice");
  r.add_identity(&alice, &alice, alice_input()).await.unwrap();

  let err = r.revoke_identity(&alice, &alice).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized { .. }));
  let err = r.revoke_identity(&p("verifier"), &alice).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized { .. }));
}

#[tokio::test]
async fn unauthorized_wins_over_not_found() {
  let r = staffed_registry().await;

  // No record for "ghost" — but an unauthorized caller must not be able
  // to tell.
  let err = r
    .revoke_identity(&p("alice"), &p("ghost"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized { .. }));
}

// ─── Delete / recreate ───────────────────────────────────────────────────────

#[tokio::test]
async fn delete_then_get_fails_then_recreate_starts_fresh() {
  let r = staffed_registry().await;
  let alice = p("alice");

  r.add_identity(&alice, &alice, alice_input()).await.unwrap();
  r.verify_identity(&p("verifier"), &alice).await.unwrap();
  r.delete_identity(&alice, &alice).await.unwrap();

  let err = r.get_identity(&alice).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));

  // Recreation yields a fresh, unverified record.
  r.add_identity(&alice, &alice, NewIdentity::new("Bob", "bob@x.com").unwrap())
    .await
    .unwrap();
  let record = r.get_identity(&alice).await.unwrap();
  assert_eq!(record.name, "Bob");
  assert_eq!(record.email, "bob@x.com");
  assert!(!record.is_verified);
  assert!(record.exists);
}

#[tokio::test]
async fn admin_can_delete_on_behalf() {
  let r = staffed_registry().await;
  let alice = p("alice");
  r.add_identity(&alice, &alice, alice_input()).await.unwrap();

  let err = r.delete_identity(&p("bob"), &alice).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized { .. }));

  r.delete_identity(&p("ops"), &alice).await.unwrap();
  assert!(r.get_identity(&alice).await.is_err());
}

// ─── Roles ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn role_defaults_to_unassigned() {
  let r = registry().await;
  assert_eq!(r.role_of(&p("anyone")).await.unwrap(), Role::Unassigned);
}

#[tokio::test]
async fn assign_role_is_reserved_to_the_administrator() {
  let r = registry().await;

  let err = r
    .assign_role(&p("alice"), &p("alice"), Role::Verifier)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized { .. }));

  r.assign_role(&p("deployer"), &p("alice"), Role::Verifier)
    .await
    .unwrap();
  assert_eq!(r.role_of(&p("alice")).await.unwrap(), Role::Verifier);

  // Reassignment overwrites.
  r.assign_role(&p("deployer"), &p("alice"), Role::Admin)
    .await
    .unwrap();
  assert_eq!(r.role_of(&p("alice")).await.unwrap(), Role::Admin);
}

#[tokio::test]
async fn role_assignment_is_independent_of_record_existence() {
  let r = registry().await;

  // "verifier" never registers an identity but still holds a role.
  r.assign_role(&p("deployer"), &p("verifier"), Role::Verifier)
    .await
    .unwrap();
  assert_eq!(r.role_of(&p("verifier")).await.unwrap(), Role::Verifier);
  assert!(r.get_identity(&p("verifier")).await.is_err());
}

// ─── Audit surface ───────────────────────────────────────────────────────────

#[tokio::test]
async fn each_success_broadcasts_exactly_one_event() {
  let r = staffed_registry().await;
  let alice = p("alice");
  let mut rx = r.subscribe();

  r.add_identity(&alice, &alice, alice_input()).await.unwrap();
  r.verify_identity(&p("verifier"), &alice).await.unwrap();
  r.revoke_identity(&p("ops"), &alice).await.unwrap();
  r.delete_identity(&alice, &alice).await.unwrap();

  let tags: Vec<_> = (0..4)
    .map(|_| rx.try_recv().unwrap().action.tag())
    .collect();
  assert_eq!(
    tags,
    [
      "Identity Added",
      "Identity Verified",
      "Identity Revoked",
      "Identity Deleted"
    ]
  );
  assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn failed_calls_emit_no_events() {
  let r = staffed_registry().await;
  let alice = p("alice");
  let mut rx = r.subscribe();

  // NotFound, Unauthorized, AlreadyExists — none may reach subscribers.
  r.verify_identity(&p("verifier"), &alice).await.unwrap_err();
  r.add_identity(&alice, &alice, alice_input()).await.unwrap();
  let _ = rx.try_recv().unwrap();
  r.add_identity(&alice, &alice, alice_input()).await.unwrap_err();
  r.revoke_identity(&alice, &alice).await.unwrap_err();

  assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn add_and_update_events_carry_snapshots() {
  let r = registry().await;
  let alice = p("alice");

  let added = r.add_identity(&alice, &alice, alice_input()).await.unwrap();
  assert_eq!(added.action, AuditAction::Added);
  let snapshot = added.snapshot.expect("add carries a snapshot");
  assert_eq!(snapshot.name, "Alice");
  assert!(!snapshot.is_verified);

  let updated = r
    .update_identity(
      &alice,
      &alice,
      NewIdentity::new("Alice L", "alice@example.com").unwrap(),
    )
    .await
    .unwrap();
  assert_eq!(updated.snapshot.expect("update carries a snapshot").name, "Alice L");
}

#[tokio::test]
async fn audit_log_persists_events_newest_first() {
  let r = staffed_registry().await;
  let alice = p("alice");

  r.add_identity(&alice, &alice, alice_input()).await.unwrap();
  r.verify_identity(&p("verifier"), &alice).await.unwrap();

  let log = r.audit_log(10).await.unwrap();
  assert_eq!(log.len(), 2);
  assert_eq!(log[0].action, AuditAction::Verified);
  assert_eq!(log[1].action, AuditAction::Added);
  assert_eq!(log[0].caller, p("verifier"));
  assert_eq!(log[0].target, alice);
  assert!(log[1].snapshot.is_some());
  assert!(log[0].snapshot.is_none());

  // Limit applies from the newest end.
  let latest = r.audit_log(1).await.unwrap();
  assert_eq!(latest.len(), 1);
  assert_eq!(latest[0].action, AuditAction::Verified);
}

// ─── Administrator fixing ────────────────────────────────────────────────────

#[tokio::test]
async fn administrator_is_fixed_at_creation() {
  let r = registry().await;
  assert_eq!(r.administrator(), &p("deployer"));
}
