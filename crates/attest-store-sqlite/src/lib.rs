//! SQLite backend for the Attest identity registry.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every mutation executes its
//! authorization check, precondition check, write, and audit append inside
//! one transaction on that single connection, which gives the registry its
//! one-operation-at-a-time atomicity.

mod encode;
mod schema;
mod store;

pub use store::SqliteRegistry;

#[cfg(test)]
mod tests;
