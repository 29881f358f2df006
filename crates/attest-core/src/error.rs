//! Error types for `attest-core`.
//!
//! The first four variants are the registry's operation contract: every
//! failure a caller can provoke maps to exactly one of them, and the
//! registry's state is unchanged whenever one is returned.

use thiserror::Error;

use crate::principal::Principal;

#[derive(Debug, Error)]
pub enum Error {
  #[error("identity already exists for {0}")]
  AlreadyExists(Principal),

  #[error("identity does not exist for {0}")]
  NotFound(Principal),

  #[error("{principal} is not authorized to {action}")]
  Unauthorized {
    principal: Principal,
    action:    &'static str,
  },

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// A backend failure (database, decoding) with no domain meaning.
  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
