//! Persistence traits for notifications and charges.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{
    BillingEvent, BillingEventKind, Charge, ChargeStatus, NotificationKind, NotificationRecord,
    NotificationStatus,
};

/// Result of `mark_failed`: the attempts counter after the write and the
/// status the record landed on (`Pending` while retryable, `Failed` once
/// the attempt budget is spent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureTransition {
    pub attempts: u32,
    pub status: NotificationStatus,
}

/// Queue of outbound notifications (`sicoob_notificacoes`).
///
/// `mark_failed` reads the current attempts counter and writes the
/// incremented value back, so a single worker instance must own the
/// queue; see the notifier crate docs for the serialization contract.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Oldest pending records first, with the charge row embedded.
    async fn fetch_pending(&self, limit: u32) -> Result<Vec<NotificationRecord>>;

    /// Transition a record to Sent. Idempotent: a record already Sent is
    /// left untouched.
    async fn mark_sent(&self, id: &str) -> Result<()>;

    /// Record a failed attempt, keeping the record Pending while attempts
    /// remain and moving it to Failed on the last one.
    async fn mark_failed(&self, id: &str, reason: &str) -> Result<FailureTransition>;

    /// Park a record as Failed immediately, leaving the attempts counter
    /// untouched: no dispatch was attempted. For defects retry can never
    /// heal (charge gone, recipient absent, amount absent from every
    /// source).
    async fn mark_failed_terminal(&self, id: &str, reason: &str) -> Result<()>;

    /// Enqueue a new Pending notification for a charge.
    async fn insert_pending(
        &self,
        identificador_cobranca: &str,
        kind: NotificationKind,
        payload: Value,
    ) -> Result<()>;
}

/// Charge rows (`sicoob_cobrancas`) and the webhook audit trail.
#[async_trait]
pub trait ChargeStore: Send + Sync {
    async fn fetch_charge(&self, identificador: &str) -> Result<Option<Charge>>;

    /// Apply a billing event to a charge: status transition, paid amount
    /// when present, and an entry appended to the charge history.
    async fn apply_billing_event(
        &self,
        identificador: &str,
        status: ChargeStatus,
        event: &BillingEvent,
    ) -> Result<()>;

    /// Persist a received webhook event for auditing.
    async fn record_webhook_event(&self, event: &BillingEvent, kind: BillingEventKind)
    -> Result<()>;
}
