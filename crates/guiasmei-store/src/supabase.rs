//! PostgREST client for the Supabase project backing GuiasMEI.
//!
//! Three tables are touched here: `sicoob_cobrancas` (charges),
//! `sicoob_notificacoes` (outbound queue) and `sicoob_webhook_events`
//! (audit trail). All access goes through the service-role key.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use guiasmei_core::config::SupabaseConfig;
use guiasmei_core::error::{GuiasMeiError, Result};
use guiasmei_core::traits::store::{ChargeStore, FailureTransition, NotificationStore};
use guiasmei_core::types::{
    BillingEvent, BillingEventKind, Charge, ChargeStatus, NotificationKind, NotificationRecord,
    NotificationStatus,
};

use crate::MAX_ATTEMPTS;

const CHARGES_TABLE: &str = "sicoob_cobrancas";
const NOTIFICATIONS_TABLE: &str = "sicoob_notificacoes";
const WEBHOOK_EVENTS_TABLE: &str = "sicoob_webhook_events";

/// Supabase-backed store. Cheap to clone the inner client; construct once
/// and share behind an `Arc<dyn NotificationStore>` / `Arc<dyn ChargeStore>`.
#[derive(Debug)]
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(GuiasMeiError::Config(
                "Supabase URL and service key not configured".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| GuiasMeiError::Store(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
        })
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.endpoint(table))
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let response = self
            .request(Method::GET, table)
            .query(query)
            .send()
            .await
            .map_err(|e| GuiasMeiError::Store(format!("{table} select failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GuiasMeiError::Store(format!(
                "{table} select: HTTP {status}: {text}"
            )));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| GuiasMeiError::Store(format!("{table} rows: {e}")))
    }

    async fn patch_rows(&self, table: &str, filters: &[(&str, &str)], body: &Value) -> Result<()> {
        let response = self
            .request(Method::PATCH, table)
            .query(filters)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await
            .map_err(|e| GuiasMeiError::Store(format!("{table} update failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GuiasMeiError::Store(format!(
                "{table} update: HTTP {status}: {text}"
            )));
        }
        Ok(())
    }

    async fn insert_row(&self, table: &str, body: &Value) -> Result<()> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await
            .map_err(|e| GuiasMeiError::Store(format!("{table} insert failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GuiasMeiError::Store(format!(
                "{table} insert: HTTP {status}: {text}"
            )));
        }
        Ok(())
    }

    /// Current attempts counter for a notification, 0 when the row is
    /// missing (the follow-up PATCH then matches nothing).
    async fn read_attempts(&self, id_filter: &str) -> Result<u32> {
        let rows: Vec<Value> = self
            .select(
                NOTIFICATIONS_TABLE,
                &[("select", "tentativas"), ("id", id_filter)],
            )
            .await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("tentativas"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32)
    }
}

/// PATCH filters for `mark_sent`. The status guard makes a repeat call
/// match no rows, so `processado_em` is written at most once.
fn sent_filters(id_filter: &str) -> [(&str, &str); 2] {
    [("id", id_filter), ("status", "eq.PENDENTE")]
}

/// Compute the state a record lands on after one more failed attempt.
fn failure_transition(attempts_before: u32) -> FailureTransition {
    let attempts = attempts_before + 1;
    let status = if attempts >= MAX_ATTEMPTS {
        NotificationStatus::Failed
    } else {
        NotificationStatus::Pending
    };
    FailureTransition { attempts, status }
}

/// History entry appended to `sicoob_cobrancas.historico` per event.
fn history_entry(event: &BillingEvent) -> Value {
    json!({
        "evento": event.tipo_evento,
        "data": event.timestamp.to_rfc3339(),
        "dados": event.dados,
    })
}

#[async_trait]
impl NotificationStore for SupabaseStore {
    async fn fetch_pending(&self, limit: u32) -> Result<Vec<NotificationRecord>> {
        let select = format!("*,cobranca:{CHARGES_TABLE}!identificador_cobranca(*)");
        let limit = limit.to_string();
        let records: Vec<NotificationRecord> = self
            .select(
                NOTIFICATIONS_TABLE,
                &[
                    ("select", select.as_str()),
                    ("status", "eq.PENDENTE"),
                    ("order", "criado_em.asc"),
                    ("limit", limit.as_str()),
                ],
            )
            .await?;

        tracing::debug!("fetched {} pending notification(s)", records.len());
        Ok(records)
    }

    async fn mark_sent(&self, id: &str) -> Result<()> {
        let id_filter = format!("eq.{id}");
        let body = json!({
            "status": NotificationStatus::Sent.as_str(),
            "processado_em": Utc::now().to_rfc3339(),
            "erro_mensagem": Value::Null,
        });
        // Filtered on the current status: a record already Sent matches
        // nothing and the call is a no-op.
        self.patch_rows(NOTIFICATIONS_TABLE, &sent_filters(id_filter.as_str()), &body)
            .await
    }

    async fn mark_failed(&self, id: &str, reason: &str) -> Result<FailureTransition> {
        let id_filter = format!("eq.{id}");

        // Read-then-write on the attempts counter. Safe only because a
        // single notifier instance owns this queue.
        let attempts_before = self.read_attempts(&id_filter).await?;

        let transition = failure_transition(attempts_before);
        let body = json!({
            "status": transition.status.as_str(),
            "tentativas": transition.attempts,
            "ultima_tentativa": Utc::now().to_rfc3339(),
            "erro_mensagem": reason,
        });
        self.patch_rows(NOTIFICATIONS_TABLE, &[("id", id_filter.as_str())], &body)
            .await?;

        Ok(transition)
    }

    async fn mark_failed_terminal(&self, id: &str, reason: &str) -> Result<()> {
        let id_filter = format!("eq.{id}");
        // No dispatch happened, so `tentativas` stays as it was.
        let body = json!({
            "status": NotificationStatus::Failed.as_str(),
            "ultima_tentativa": Utc::now().to_rfc3339(),
            "erro_mensagem": reason,
        });
        self.patch_rows(NOTIFICATIONS_TABLE, &[("id", id_filter.as_str())], &body)
            .await
    }

    async fn insert_pending(
        &self,
        identificador_cobranca: &str,
        kind: NotificationKind,
        payload: Value,
    ) -> Result<()> {
        let body = json!({
            "identificador_cobranca": identificador_cobranca,
            "tipo_notificacao": kind.as_tag(),
            "dados_notificacao": payload,
            "status": NotificationStatus::Pending.as_str(),
            "tentativas": 0,
            "criado_em": Utc::now().to_rfc3339(),
        });
        self.insert_row(NOTIFICATIONS_TABLE, &body).await
    }
}

#[async_trait]
impl ChargeStore for SupabaseStore {
    async fn fetch_charge(&self, identificador: &str) -> Result<Option<Charge>> {
        let id_filter = format!("eq.{identificador}");
        let rows: Vec<Charge> = self
            .select(
                CHARGES_TABLE,
                &[("identificador", id_filter.as_str()), ("limit", "1")],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn apply_billing_event(
        &self,
        identificador: &str,
        status: ChargeStatus,
        event: &BillingEvent,
    ) -> Result<()> {
        let mut history = self
            .fetch_charge(identificador)
            .await?
            .and_then(|charge| charge.historico)
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default();
        history.push(history_entry(event));

        let mut body = json!({
            "status": status.as_str(),
            "historico": history,
            "atualizado_em": Utc::now().to_rfc3339(),
        });
        // Paid events carry the settled amount.
        if status == ChargeStatus::Pago
            && let Some(valor) = event.amount()
        {
            body["valor_pago"] = json!(valor);
        }

        let id_filter = format!("eq.{identificador}");
        self.patch_rows(CHARGES_TABLE, &[("identificador", id_filter.as_str())], &body)
            .await
    }

    async fn record_webhook_event(
        &self,
        event: &BillingEvent,
        kind: BillingEventKind,
    ) -> Result<()> {
        let body = json!({
            "evento_id": event.evento_id,
            "tipo_evento": kind.as_persisted_tag(),
            "timestamp": event.timestamp.to_rfc3339(),
            "dados": event.dados,
            "processado_em": Utc::now().to_rfc3339(),
        });
        self.insert_row(WEBHOOK_EVENTS_TABLE, &body).await
    }
}
