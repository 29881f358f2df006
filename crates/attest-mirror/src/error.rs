//! Error type for `attest-mirror`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid mirror config: {0}")]
  Config(String),

  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// The gateway answered but the ledger refused the transaction.
  #[error("ledger rejected submission: {0}")]
  Rejected(String),

  #[error("malformed gateway response: {0}")]
  Response(String),

  #[error("memo decode error: {0}")]
  Memo(String),

  /// The retry budget ran out; `source` is the final attempt's failure.
  #[error("submission failed after {attempts} attempts")]
  RetriesExhausted {
    attempts: u32,
    #[source]
    source:   Box<Error>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
