//! SQL schema for the Attest SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// `live` is the column name for the record's existence flag — `exists`
/// is an SQL keyword.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per principal that has ever registered. Deletion resets the
-- row in place; `live` is the existence predicate, not row absence.
CREATE TABLE IF NOT EXISTS identities (
    principal   TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL,
    is_verified INTEGER NOT NULL DEFAULT 0,
    live        INTEGER NOT NULL DEFAULT 1,
    recorded_at TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    updated_at  TEXT NOT NULL
);

-- Role assignment is independent of identity-record existence.
CREATE TABLE IF NOT EXISTS roles (
    principal TEXT PRIMARY KEY,
    role      TEXT NOT NULL      -- 'unassigned' | 'admin' | 'verifier'
);

-- The audit log is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS audit_log (
    event_id    TEXT PRIMARY KEY,
    caller      TEXT NOT NULL,
    target      TEXT NOT NULL,
    action      TEXT NOT NULL,   -- tag string, e.g. 'Identity Added'
    snapshot    TEXT,            -- JSON IdentityRecord for add/update
    recorded_at TEXT NOT NULL
);

-- Registry-level facts, e.g. the administrator principal fixed at
-- creation. First writer wins; reopening never overwrites.
CREATE TABLE IF NOT EXISTS registry_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS audit_target_idx   ON audit_log(target);
CREATE INDEX IF NOT EXISTS audit_recorded_idx ON audit_log(recorded_at);

PRAGMA user_version = 1;
";
