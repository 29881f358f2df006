//! [`SqliteRegistry`] — the SQLite implementation of [`IdentityRegistry`].

use std::path::Path;

use attest_core::{
  Error, Result,
  authz::{self, AuthzContext, Operation},
  event::{AuditAction, AuditEvent},
  principal::{Principal, Role},
  record::{IdentityRecord, NewIdentity},
  registry::IdentityRegistry,
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  encode::{RawAuditEvent, RawIdentity, decode_dt, decode_role, encode_dt, encode_role},
  schema::SCHEMA,
};

/// Capacity of the audit broadcast channel. A subscriber that falls this
/// many events behind observes `Lagged`, never a stalled registry.
const AUDIT_CHANNEL_CAPACITY: usize = 256;

// ─── Registry ────────────────────────────────────────────────────────────────

/// An identity registry backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted and the
/// audit sender is shared. All mutations run on the connection's single
/// worker thread, one transaction each, which is what makes every
/// check-then-write atomic.
#[derive(Clone)]
pub struct SqliteRegistry {
  conn:          tokio_rusqlite::Connection,
  administrator: Principal,
  audit_tx:      broadcast::Sender<AuditEvent>,
}

impl SqliteRegistry {
  /// Open (or create) a registry at `path` and run schema initialisation.
  ///
  /// `administrator` is fixed into the store on first creation, mirroring
  /// a contract's deploying account; reopening an existing store keeps
  /// the administrator it was created with.
  pub async fn open(
    path: impl AsRef<Path>,
    administrator: Principal,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(storage)?;
    Self::init(conn, administrator).await
  }

  /// Open an in-memory registry — useful for testing.
  pub async fn open_in_memory(administrator: Principal) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(storage)?;
    Self::init(conn, administrator).await
  }

  async fn init(
    conn: tokio_rusqlite::Connection,
    administrator: Principal,
  ) -> Result<Self> {
    let admin_str = administrator.as_str().to_owned();

    let effective: String = conn
      .call(move |conn| {
        conn.execute_batch(SCHEMA)?;
        conn.execute(
          "INSERT INTO registry_meta (key, value) VALUES ('administrator', ?1)
           ON CONFLICT(key) DO NOTHING",
          rusqlite::params![admin_str],
        )?;
        let stored: String = conn.query_row(
          "SELECT value FROM registry_meta WHERE key = 'administrator'",
          [],
          |row| row.get(0),
        )?;
        Ok(stored)
      })
      .await
      .map_err(storage)?;

    let (audit_tx, _) = broadcast::channel(AUDIT_CHANNEL_CAPACITY);

    Ok(Self {
      conn,
      administrator: Principal::new(effective)?,
      audit_tx,
    })
  }

  /// The administrator principal this registry enforces for `assign_role`.
  pub fn administrator(&self) -> &Principal { &self.administrator }

  /// Subscribe to audit events. Each committed mutation is broadcast
  /// exactly once, after its transaction commits.
  pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
    self.audit_tx.subscribe()
  }

  /// Broadcast `event` and hand it back. A send error only means there
  /// are currently no subscribers.
  fn emit(&self, event: AuditEvent) -> AuditEvent {
    let _ = self.audit_tx.send(event.clone());
    event
  }

  /// Shared shell for verify/revoke/delete: role-gated, requires a live
  /// record, applies `sql` (bound to `?1` principal, `?2` timestamp),
  /// appends the audit row, commits.
  async fn gated_update(
    &self,
    caller: &Principal,
    target: &Principal,
    op: Operation,
    action: AuditAction,
    sql: &'static str,
  ) -> Result<AuditEvent> {
    let event_id = Uuid::new_v4();
    let now = Utc::now();
    let now_str = encode_dt(now);
    let event_id_str = event_id.hyphenated().to_string();
    let caller_p = caller.clone();
    let target_p = target.clone();
    let admin_p = self.administrator.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Err(e) = authorize_tx(&tx, op, &caller_p, &target_p, &admin_p)? {
          return Ok(Err(e));
        }

        let live = matches!(
          read_identity(&tx, target_p.as_str())?,
          Some(row) if row.live
        );
        if !live {
          return Ok(Err(Error::NotFound(target_p)));
        }

        tx.execute(sql, rusqlite::params![target_p.as_str(), now_str])?;
        append_audit(
          &tx,
          &event_id_str,
          caller_p.as_str(),
          target_p.as_str(),
          action.tag(),
          None,
          &now_str,
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await
      .map_err(storage)??;

    Ok(self.emit(AuditEvent {
      event_id,
      caller: caller.clone(),
      target: target.clone(),
      action,
      snapshot: None,
      recorded_at: now,
    }))
  }
}

const VERIFY_SQL: &str =
  "UPDATE identities SET is_verified = 1, updated_at = ?2 WHERE principal = ?1";
const REVOKE_SQL: &str =
  "UPDATE identities SET is_verified = 0, updated_at = ?2 WHERE principal = ?1";
const DELETE_SQL: &str = "UPDATE identities
   SET name = '', email = '', is_verified = 0, live = 0, updated_at = ?2
   WHERE principal = ?1";

// ─── IdentityRegistry impl ───────────────────────────────────────────────────

impl IdentityRegistry for SqliteRegistry {
  async fn add_identity(
    &self,
    caller: &Principal,
    target: &Principal,
    input: NewIdentity,
  ) -> Result<AuditEvent> {
    let event_id = Uuid::new_v4();
    let now = Utc::now();
    let now_str = encode_dt(now);
    let event_id_str = event_id.hyphenated().to_string();
    let caller_p = caller.clone();
    let target_p = target.clone();
    let admin_p = self.administrator.clone();

    let record = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Err(e) =
          authorize_tx(&tx, Operation::Add, &caller_p, &target_p, &admin_p)?
        {
          return Ok(Err(e));
        }

        let live = matches!(
          read_identity(&tx, target_p.as_str())?,
          Some(row) if row.live
        );
        if live {
          return Ok(Err(Error::AlreadyExists(target_p)));
        }

        // A previously-deleted principal keeps its (inert) row; recreate
        // in place so `principal` stays the primary key either way.
        tx.execute(
          "INSERT INTO identities
             (principal, name, email, is_verified, live, recorded_at, updated_at)
           VALUES (?1, ?2, ?3, 0, 1, ?4, ?4)
           ON CONFLICT(principal) DO UPDATE SET
             name        = excluded.name,
             email       = excluded.email,
             is_verified = 0,
             live        = 1,
             recorded_at = excluded.recorded_at,
             updated_at  = excluded.updated_at",
          rusqlite::params![
            target_p.as_str(),
            input.name(),
            input.email(),
            now_str
          ],
        )?;

        let record = IdentityRecord {
          principal:   target_p.clone(),
          name:        input.name().to_owned(),
          email:       input.email().to_owned(),
          is_verified: false,
          exists:      true,
          recorded_at: now,
          updated_at:  now,
        };
        let snapshot_json = match serde_json::to_string(&record) {
          Ok(s) => s,
          Err(e) => return Ok(Err(e.into())),
        };

        append_audit(
          &tx,
          &event_id_str,
          caller_p.as_str(),
          target_p.as_str(),
          AuditAction::Added.tag(),
          Some(&snapshot_json),
          &now_str,
        )?;
        tx.commit()?;
        Ok(Ok(record))
      })
      .await
      .map_err(storage)??;

    Ok(self.emit(AuditEvent {
      event_id,
      caller: caller.clone(),
      target: target.clone(),
      action: AuditAction::Added,
      snapshot: Some(record),
      recorded_at: now,
    }))
  }

  async fn update_identity(
    &self,
    caller: &Principal,
    target: &Principal,
    input: NewIdentity,
  ) -> Result<AuditEvent> {
    let event_id = Uuid::new_v4();
    let now = Utc::now();
    let now_str = encode_dt(now);
    let event_id_str = event_id.hyphenated().to_string();
    let caller_p = caller.clone();
    let target_p = target.clone();
    let admin_p = self.administrator.clone();

    let record = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Err(e) =
          authorize_tx(&tx, Operation::Update, &caller_p, &target_p, &admin_p)?
        {
          return Ok(Err(e));
        }

        let row = match read_identity(&tx, target_p.as_str())? {
          Some(row) if row.live => row,
          _ => return Ok(Err(Error::NotFound(target_p))),
        };

        tx.execute(
          "UPDATE identities SET name = ?2, email = ?3, updated_at = ?4
           WHERE principal = ?1",
          rusqlite::params![
            target_p.as_str(),
            input.name(),
            input.email(),
            now_str
          ],
        )?;

        let recorded_at = match decode_dt(&row.recorded_at) {
          Ok(t) => t,
          Err(e) => return Ok(Err(e)),
        };
        let record = IdentityRecord {
          principal:   target_p.clone(),
          name:        input.name().to_owned(),
          email:       input.email().to_owned(),
          is_verified: row.is_verified,
          exists:      true,
          recorded_at,
          updated_at:  now,
        };
        let snapshot_json = match serde_json::to_string(&record) {
          Ok(s) => s,
          Err(e) => return Ok(Err(e.into())),
        };

        append_audit(
          &tx,
          &event_id_str,
          caller_p.as_str(),
          target_p.as_str(),
          AuditAction::Updated.tag(),
          Some(&snapshot_json),
          &now_str,
        )?;
        tx.commit()?;
        Ok(Ok(record))
      })
      .await
      .map_err(storage)??;

    Ok(self.emit(AuditEvent {
      event_id,
      caller: caller.clone(),
      target: target.clone(),
      action: AuditAction::Updated,
      snapshot: Some(record),
      recorded_at: now,
    }))
  }

  async fn verify_identity(
    &self,
    caller: &Principal,
    target: &Principal,
  ) -> Result<AuditEvent> {
    // Re-verifying an already-verified record is a no-op success; the
    // write is unconditional and the call is audited like any other.
    self
      .gated_update(
        caller,
        target,
        Operation::Verify,
        AuditAction::Verified,
        VERIFY_SQL,
      )
      .await
  }

  async fn revoke_identity(
    &self,
    caller: &Principal,
    target: &Principal,
  ) -> Result<AuditEvent> {
    self
      .gated_update(
        caller,
        target,
        Operation::Revoke,
        AuditAction::Revoked,
        REVOKE_SQL,
      )
      .await
  }

  async fn delete_identity(
    &self,
    caller: &Principal,
    target: &Principal,
  ) -> Result<AuditEvent> {
    self
      .gated_update(
        caller,
        target,
        Operation::Delete,
        AuditAction::Deleted,
        DELETE_SQL,
      )
      .await
  }

  async fn get_identity(&self, target: &Principal) -> Result<IdentityRecord> {
    let target_s = target.as_str().to_owned();

    let raw = self
      .conn
      .call(move |conn| Ok(read_identity(conn, &target_s)?))
      .await
      .map_err(storage)?;

    match raw {
      Some(row) if row.live => row.into_record(),
      _ => Err(Error::NotFound(target.clone())),
    }
  }

  async fn assign_role(
    &self,
    caller: &Principal,
    principal: &Principal,
    role: Role,
  ) -> Result<()> {
    let caller_p = caller.clone();
    let principal_p = principal.clone();
    let admin_p = self.administrator.clone();
    let role_str = encode_role(role);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Err(e) = authorize_tx(
          &tx,
          Operation::AssignRole,
          &caller_p,
          &principal_p,
          &admin_p,
        )? {
          return Ok(Err(e));
        }

        tx.execute(
          "INSERT INTO roles (principal, role) VALUES (?1, ?2)
           ON CONFLICT(principal) DO UPDATE SET role = excluded.role",
          rusqlite::params![principal_p.as_str(), role_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await
      .map_err(storage)?
  }

  async fn role_of(&self, principal: &Principal) -> Result<Role> {
    let principal_s = principal.as_str().to_owned();

    let raw = self
      .conn
      .call(move |conn| Ok(read_role(conn, &principal_s)?))
      .await
      .map_err(storage)?;

    match raw {
      Some(s) => decode_role(&s),
      None => Ok(Role::Unassigned),
    }
  }

  async fn audit_log(&self, limit: usize) -> Result<Vec<AuditEvent>> {
    let raws: Vec<RawAuditEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT event_id, caller, target, action, snapshot, recorded_at
           FROM audit_log
           ORDER BY recorded_at DESC, rowid DESC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit as i64], |row| {
            Ok(RawAuditEvent {
              event_id:    row.get(0)?,
              caller:      row.get(1)?,
              target:      row.get(2)?,
              action:      row.get(3)?,
              snapshot:    row.get(4)?,
              recorded_at: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws.into_iter().map(RawAuditEvent::into_event).collect()
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn storage(e: tokio_rusqlite::Error) -> Error { Error::Storage(e.to_string()) }

/// Resolve the caller's role and authorize `op`, all inside the caller's
/// transaction. Authorization runs before any record read so a failed
/// caller learns nothing about the target.
fn authorize_tx(
  tx: &rusqlite::Connection,
  op: Operation,
  caller: &Principal,
  target: &Principal,
  administrator: &Principal,
) -> rusqlite::Result<Result<()>> {
  let caller_role = match read_role(tx, caller.as_str())? {
    Some(raw) => match decode_role(&raw) {
      Ok(role) => role,
      Err(e) => return Ok(Err(e)),
    },
    None => Role::Unassigned,
  };

  let ctx = AuthzContext {
    caller,
    target,
    caller_role,
    administrator,
  };
  Ok(authz::authorize(op, &ctx))
}

fn read_role(
  conn: &rusqlite::Connection,
  principal: &str,
) -> rusqlite::Result<Option<String>> {
  conn
    .query_row(
      "SELECT role FROM roles WHERE principal = ?1",
      rusqlite::params![principal],
      |row| row.get(0),
    )
    .optional()
}

fn read_identity(
  conn: &rusqlite::Connection,
  principal: &str,
) -> rusqlite::Result<Option<RawIdentity>> {
  conn
    .query_row(
      "SELECT principal, name, email, is_verified, live, recorded_at, updated_at
       FROM identities WHERE principal = ?1",
      rusqlite::params![principal],
      |row| {
        Ok(RawIdentity {
          principal:   row.get(0)?,
          name:        row.get(1)?,
          email:       row.get(2)?,
          is_verified: row.get(3)?,
          live:        row.get(4)?,
          recorded_at: row.get(5)?,
          updated_at:  row.get(6)?,
        })
      },
    )
    .optional()
}

fn append_audit(
  conn: &rusqlite::Connection,
  event_id: &str,
  caller: &str,
  target: &str,
  action: &str,
  snapshot: Option<&str>,
  recorded_at: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO audit_log (event_id, caller, target, action, snapshot, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![event_id, caller, target, action, snapshot, recorded_at],
  )?;
  Ok(())
}
