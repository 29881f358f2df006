//! Ledger-mirror client — best-effort anchoring of registry state and
//! actions on an external ledger network.
//!
//! The mirror is out-of-band by contract: callers invoke it after a
//! registry mutation has committed, and its failure never rolls the
//! registry back. Each submission is a self-payment on the configured
//! account whose payload rides in hex-encoded memos; submissions are
//! retried a bounded number of times with a fixed backoff before the
//! error surfaces.

pub mod error;
pub mod memo;

pub use error::{Error, Result};

use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};

use crate::memo::{MEMO_TYPE_ACTION, MEMO_TYPE_IDENTITY, MemoEnvelope};

/// Nominal self-payment carrying the memos, in drops.
const ANCHOR_AMOUNT_DROPS: &str = "1000000";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection settings for the ledger gateway.
///
/// Endpoint and signing credential are injected here and scoped to the
/// [`LedgerMirror`] built from them; nothing is read from globals.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
  /// JSON-RPC endpoint of the ledger gateway.
  pub endpoint:        String,
  /// Account the anchoring transactions are submitted from (and to).
  pub account:         String,
  /// Signing credential for `account`.
  pub signing_seed:    String,
  /// Additional attempts after the first failed submission.
  pub max_retries:     u32,
  /// Fixed pause between attempts.
  pub retry_backoff:   Duration,
  pub request_timeout: Duration,
}

impl MirrorConfig {
  pub fn new(
    endpoint: impl Into<String>,
    account: impl Into<String>,
    signing_seed: impl Into<String>,
  ) -> Self {
    Self {
      endpoint:        endpoint.into(),
      account:         account.into(),
      signing_seed:    signing_seed.into(),
      max_retries:     2,
      retry_backoff:   Duration::from_secs(1),
      request_timeout: Duration::from_secs(30),
    }
  }

  fn validate(&self) -> Result<()> {
    if self.endpoint.trim().is_empty() {
      return Err(Error::Config("endpoint must be non-empty".into()));
    }
    if self.account.trim().is_empty() {
      return Err(Error::Config("account must be non-empty".into()));
    }
    if self.signing_seed.trim().is_empty() {
      return Err(Error::Config("signing seed must be non-empty".into()));
    }
    Ok(())
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

/// The anchoring transaction: a self-payment whose memos carry the data.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Payment {
  transaction_type: &'static str,
  account:          String,
  destination:      String,
  amount:           String,
  memos:            Vec<MemoEnvelope>,
}

/// Confirmation for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
  pub tx_hash:      String,
  /// Present when the gateway already knows the validating ledger.
  pub ledger_index: Option<u64>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Client for the ledger gateway.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based. Each
/// operation acquires a connection, performs exactly one request/response,
/// and returns the connection on every exit path; there is no
/// connect/disconnect for call sites to forget.
#[derive(Clone)]
pub struct LedgerMirror {
  client: reqwest::Client,
  config: MirrorConfig,
}

impl LedgerMirror {
  pub fn new(config: MirrorConfig) -> Result<Self> {
    config.validate()?;
    let client = reqwest::Client::builder()
      .timeout(config.request_timeout)
      .build()?;
    Ok(Self { client, config })
  }

  /// Anchor an identity snapshot: `{account, ...snapshot}` as JSON in an
  /// `identity` memo.
  pub async fn store_identity(
    &self,
    account: &str,
    snapshot: &Value,
  ) -> Result<Receipt> {
    let mut payload = serde_json::Map::new();
    payload.insert("account".into(), json!(account));
    match snapshot {
      Value::Object(fields) => payload.extend(fields.clone()),
      other => {
        payload.insert("identity".into(), other.clone());
      }
    }
    let data = Value::Object(payload).to_string();

    self
      .submit_with_retry(vec![memo::memo(MEMO_TYPE_IDENTITY, &data)])
      .await
  }

  /// Anchor an action tag (e.g. `"Identity Verified"`) in an `action`
  /// memo.
  pub async fn log_action(&self, tag: &str) -> Result<Receipt> {
    self
      .submit_with_retry(vec![memo::memo(MEMO_TYPE_ACTION, tag)])
      .await
  }

  /// Look up the most recent anchored identity snapshot for `account`,
  /// scanning the mirror account's transaction memos. Malformed or
  /// foreign memos are skipped, not errors.
  pub async fn fetch_identity(&self, account: &str) -> Result<Option<Value>> {
    let params = json!({
      "account": self.config.account,
      "ledger_index_min": -1,
      "ledger_index_max": -1,
      "limit": 50,
    });
    let response = self.rpc("account_tx", params).await?;
    Ok(find_identity_memo(&response, account))
  }

  /// Whether `account` has an anchored identity snapshot.
  pub async fn verified_on_ledger(&self, account: &str) -> Result<bool> {
    Ok(self.fetch_identity(account).await?.is_some())
  }

  async fn submit_with_retry(
    &self,
    memos: Vec<MemoEnvelope>,
  ) -> Result<Receipt> {
    let tx = Payment {
      transaction_type: "Payment",
      account:          self.config.account.clone(),
      destination:      self.config.account.clone(),
      amount:           ANCHOR_AMOUNT_DROPS.to_owned(),
      memos,
    };
    let params = json!({
      "tx_json": tx,
      "secret": self.config.signing_seed,
    });

    let mut attempt = 0u32;
    loop {
      match self.submit_once(&params).await {
        Ok(receipt) => return Ok(receipt),
        Err(err) if attempt < self.config.max_retries => {
          attempt += 1;
          tracing::warn!(%err, attempt, "mirror submission failed, retrying");
          tokio::time::sleep(self.config.retry_backoff).await;
        }
        Err(err) => {
          return Err(Error::RetriesExhausted {
            attempts: attempt + 1,
            source:   Box::new(err),
          });
        }
      }
    }
  }

  async fn submit_once(&self, params: &Value) -> Result<Receipt> {
    let response = self.rpc("submit", params.clone()).await?;
    parse_submit(&response)
  }

  /// One JSON-RPC request/response against the gateway.
  async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
    let body = json!({ "method": method, "params": [params] });
    let response = self
      .client
      .post(&self.config.endpoint)
      .json(&body)
      .send()
      .await?;

    if !response.status().is_success() {
      return Err(Error::Response(format!(
        "gateway returned {}",
        response.status()
      )));
    }
    Ok(response.json().await?)
  }
}

// ─── Response parsing ────────────────────────────────────────────────────────

fn parse_submit(value: &Value) -> Result<Receipt> {
  let result = value
    .get("result")
    .ok_or_else(|| Error::Response("missing result".into()))?;

  let engine_result = result
    .get("engine_result")
    .and_then(Value::as_str)
    .ok_or_else(|| Error::Response("missing engine_result".into()))?;

  if engine_result != "tesSUCCESS" {
    let message = result
      .get("engine_result_message")
      .and_then(Value::as_str)
      .unwrap_or(engine_result);
    return Err(Error::Rejected(message.to_owned()));
  }

  let tx_hash = result
    .pointer("/tx_json/hash")
    .and_then(Value::as_str)
    .ok_or_else(|| Error::Response("missing transaction hash".into()))?
    .to_owned();
  let ledger_index = result
    .get("validated_ledger_index")
    .and_then(Value::as_u64);

  Ok(Receipt { tx_hash, ledger_index })
}

fn find_identity_memo(response: &Value, account: &str) -> Option<Value> {
  let transactions = response
    .pointer("/result/transactions")
    .and_then(Value::as_array)?;
  let wanted_type = memo::encode_memo(MEMO_TYPE_IDENTITY);

  for tx in transactions {
    let Some(memos) = tx.pointer("/tx/Memos").and_then(Value::as_array)
    else {
      continue;
    };
    for envelope in memos {
      let Some(inner) = envelope.get("Memo") else { continue };
      if inner.get("MemoType").and_then(Value::as_str)
        != Some(wanted_type.as_str())
      {
        continue;
      }
      let Some(data) = inner.get("MemoData").and_then(Value::as_str) else {
        continue;
      };
      let Ok(decoded) = memo::decode_memo(data) else { continue };
      let Ok(payload) = serde_json::from_str::<Value>(&decoded) else {
        continue;
      };
      if payload.get("account").and_then(Value::as_str) == Some(account) {
        return Some(payload);
      }
    }
  }
  None
}
