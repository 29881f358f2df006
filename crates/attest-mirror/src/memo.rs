//! Memo encoding for anchoring transactions.
//!
//! The ledger carries opaque memo pairs; both halves are hex-encoded
//! UTF-8, upper-case, per the network convention.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Memo type for identity snapshots.
pub const MEMO_TYPE_IDENTITY: &str = "identity";
/// Memo type for action-tag log entries.
pub const MEMO_TYPE_ACTION: &str = "action";

pub fn encode_memo(text: &str) -> String { hex::encode_upper(text.as_bytes()) }

pub fn decode_memo(hex_str: &str) -> Result<String> {
  let bytes =
    hex::decode(hex_str).map_err(|e| Error::Memo(e.to_string()))?;
  String::from_utf8(bytes).map_err(|e| Error::Memo(e.to_string()))
}

/// One memo pair as it appears inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
  #[serde(rename = "MemoType")]
  pub memo_type: String,
  #[serde(rename = "MemoData")]
  pub memo_data: String,
}

/// The single-field wrapper the wire format wants around each memo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoEnvelope {
  #[serde(rename = "Memo")]
  pub memo: Memo,
}

/// Build a hex-encoded memo from a plain-text type and payload.
pub fn memo(memo_type: &str, data: &str) -> MemoEnvelope {
  MemoEnvelope {
    memo: Memo {
      memo_type: encode_memo(memo_type),
      memo_data: encode_memo(data),
    },
  }
}
