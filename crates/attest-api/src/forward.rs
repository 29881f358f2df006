//! Mirror forwarder — pushes committed audit events to the ledger mirror.
//!
//! Runs as a background task subscribed to the registry's audit
//! broadcast. Anchoring is best-effort and at-least-once: a mirror
//! failure is logged and the event dropped; the registry state it
//! describes is already committed and stays committed.

use attest_core::event::AuditEvent;
use attest_mirror::LedgerMirror;
use tokio::sync::broadcast::{self, error::RecvError};

/// Consume audit events until the registry (and with it every sender)
/// goes away.
pub async fn forward_audit(
  mut events: broadcast::Receiver<AuditEvent>,
  mirror: LedgerMirror,
) {
  loop {
    match events.recv().await {
      Ok(event) => forward_one(&mirror, &event).await,
      Err(RecvError::Lagged(skipped)) => {
        tracing::warn!(skipped, "audit stream lagged; events not mirrored");
      }
      Err(RecvError::Closed) => break,
    }
  }
}

/// Anchor one event: the identity snapshot first (add/update carry one),
/// then the action tag.
async fn forward_one(mirror: &LedgerMirror, event: &AuditEvent) {
  if let Some(snapshot) = &event.snapshot {
    match serde_json::to_value(snapshot) {
      Ok(value) => {
        if let Err(err) =
          mirror.store_identity(event.target.as_str(), &value).await
        {
          tracing::warn!(
            %err,
            target = %event.target,
            "failed to anchor identity snapshot"
          );
        }
      }
      Err(err) => tracing::warn!(%err, "failed to serialize snapshot"),
    }
  }

  match mirror.log_action(event.action.tag()).await {
    Ok(receipt) => {
      tracing::debug!(
        tx_hash = %receipt.tx_hash,
        action = %event.action,
        "anchored audit event"
      );
    }
    Err(err) => {
      tracing::warn!(%err, action = %event.action, "failed to anchor audit event");
    }
  }
}
