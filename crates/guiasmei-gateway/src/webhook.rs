//! Sicoob billing webhook intake.
//!
//! Requests carry a hex HMAC-SHA256 signature of the raw body in
//! `x-webhook-signature`. The event timestamp must sit inside the replay
//! window. Authenticated events update the charge and enqueue the
//! matching notification; unknown tags and unknown charges are answered
//! 200 so the provider stops redelivering them.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

use guiasmei_core::types::{BillingEvent, BillingEventKind};

use super::server::AppState;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 signature of a payload, as the provider computes it.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if !s.is_ascii() || s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

/// Constant-time signature check (via `Mac::verify_slice`).
pub fn verify_signature(secret: &str, body: &[u8], provided: &str) -> bool {
    let Some(provided) = decode_hex(provided.trim()) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

pub async fn sicoob_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let secret = &state.config.sicoob.webhook_secret;
    if secret.is_empty() {
        tracing::error!("❌ Webhook rejected: no shared secret configured");
        return unauthorized("Assinatura inválida");
    }

    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !verify_signature(secret, &body, provided) {
        tracing::warn!("🚫 Webhook rejected: bad or missing signature");
        return unauthorized("Assinatura inválida");
    }

    let event: BillingEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("🚫 Webhook rejected: malformed payload: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": format!("Payload inválido: {e}")})),
            );
        }
    };

    let skew = (Utc::now() - event.timestamp).num_seconds().abs();
    let tolerance = state.config.sicoob.webhook_tolerance_secs as i64;
    if skew > tolerance {
        tracing::warn!(
            "🚫 Webhook {} rejected: timestamp {}s outside the {}s replay window",
            event.evento_id,
            skew,
            tolerance
        );
        return unauthorized("Timestamp fora da janela aceita");
    }

    let Some(kind) = BillingEventKind::from_tag(&event.tipo_evento) else {
        tracing::info!("📭 Ignoring unknown webhook event '{}'", event.tipo_evento);
        return (
            StatusCode::OK,
            Json(serde_json::json!({"ignored": true, "tipo_evento": event.tipo_evento})),
        );
    };

    let (Some(charges), Some(notifications)) = (&state.charges, &state.notifications) else {
        tracing::error!("❌ Webhook {} dropped: store unavailable", event.evento_id);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": "Armazenamento indisponível"})),
        );
    };

    // Audit trail first; losing it must not lose the event itself.
    if let Err(e) = charges.record_webhook_event(&event, kind).await {
        tracing::warn!("⚠️ Could not record webhook event {}: {e}", event.evento_id);
    }

    let Some(identifier) = event.identifier() else {
        tracing::warn!(
            "🚫 Webhook {} rejected: no charge identifier in payload",
            event.evento_id
        );
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Evento sem identificador de cobrança"})),
        );
    };

    match charges.fetch_charge(identifier).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::info!(
                "📭 Webhook {} for unknown charge '{}', ignoring",
                event.evento_id,
                identifier
            );
            return (
                StatusCode::OK,
                Json(serde_json::json!({"ignored": true, "identificador": identifier})),
            );
        }
        Err(e) => {
            tracing::error!("❌ Charge lookup failed for webhook {}: {e}", event.evento_id);
            return internal_error("Falha ao consultar cobrança");
        }
    }

    if let Err(e) = charges
        .apply_billing_event(identifier, kind.charge_status(), &event)
        .await
    {
        tracing::error!("❌ Charge update failed for webhook {}: {e}", event.evento_id);
        return internal_error("Falha ao atualizar cobrança");
    }

    let notification_kind = kind.notification_kind();
    if let Err(e) = notifications
        .insert_pending(identifier, notification_kind.clone(), event.dados.clone())
        .await
    {
        tracing::error!(
            "❌ Notification enqueue failed for webhook {}: {e}",
            event.evento_id
        );
        return internal_error("Falha ao enfileirar notificação");
    }

    tracing::info!(
        "✅ Webhook {} processed: {} -> charge '{}' ({})",
        event.evento_id,
        event.tipo_evento,
        identifier,
        kind.charge_status().as_str()
    );

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "processado",
            "evento_id": event.evento_id,
            "identificador": identifier,
            "notificacao": notification_kind.as_tag(),
        })),
    )
}

fn unauthorized(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": message})),
    )
}

fn internal_error(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": message})),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Instant;

    use guiasmei_assistant::AssistantClient;
    use guiasmei_core::config::GuiasMeiConfig;
    use guiasmei_core::error::{GuiasMeiError, Result};
    use guiasmei_core::traits::{ChargeStore, FailureTransition, NotificationStore};
    use guiasmei_core::types::{
        Charge, ChargeStatus, NotificationKind, NotificationRecord, NotificationStatus,
    };

    const SECRET: &str = "segredo-webhook";

    #[derive(Default)]
    struct MemoryCharges {
        charges: Mutex<HashMap<String, Charge>>,
        applied: Mutex<Vec<(String, ChargeStatus)>>,
        recorded_events: Mutex<Vec<String>>,
        fail_apply: bool,
    }

    #[async_trait]
    impl ChargeStore for MemoryCharges {
        async fn fetch_charge(&self, identificador: &str) -> Result<Option<Charge>> {
            Ok(self.charges.lock().unwrap().get(identificador).cloned())
        }

        async fn apply_billing_event(
            &self,
            identificador: &str,
            status: ChargeStatus,
            _event: &BillingEvent,
        ) -> Result<()> {
            if self.fail_apply {
                return Err(GuiasMeiError::Store("PATCH failed".into()));
            }
            self.applied
                .lock()
                .unwrap()
                .push((identificador.to_string(), status));
            Ok(())
        }

        async fn record_webhook_event(
            &self,
            event: &BillingEvent,
            _kind: BillingEventKind,
        ) -> Result<()> {
            self.recorded_events
                .lock()
                .unwrap()
                .push(event.evento_id.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryQueue {
        inserted: Mutex<Vec<(String, NotificationKind, Value)>>,
    }

    #[async_trait]
    impl NotificationStore for MemoryQueue {
        async fn fetch_pending(&self, _limit: u32) -> Result<Vec<NotificationRecord>> {
            Ok(vec![])
        }

        async fn mark_sent(&self, _id: &str) -> Result<()> {
            Ok(())
        }

        async fn mark_failed(&self, _id: &str, _reason: &str) -> Result<FailureTransition> {
            Ok(FailureTransition {
                attempts: 1,
                status: NotificationStatus::Pending,
            })
        }

        async fn mark_failed_terminal(&self, _id: &str, _reason: &str) -> Result<()> {
            Ok(())
        }

        async fn insert_pending(
            &self,
            identificador_cobranca: &str,
            kind: NotificationKind,
            payload: Value,
        ) -> Result<()> {
            self.inserted.lock().unwrap().push((
                identificador_cobranca.to_string(),
                kind,
                payload,
            ));
            Ok(())
        }
    }

    fn charge_fixture(identificador: &str) -> Charge {
        Charge {
            identificador: identificador.to_string(),
            tipo: "PIX_IMEDIATA".into(),
            status: "PENDENTE".into(),
            ..Charge::default()
        }
    }

    fn test_state(
        charges: Arc<MemoryCharges>,
        queue: Arc<MemoryQueue>,
    ) -> Arc<AppState> {
        let mut config = GuiasMeiConfig::default();
        config.sicoob.webhook_secret = SECRET.into();
        Arc::new(AppState {
            config: Arc::new(config.clone()),
            notifications: Some(queue as Arc<dyn NotificationStore>),
            charges: Some(charges as Arc<dyn ChargeStore>),
            assistant: Arc::new(AssistantClient::new(&config.llm)),
            start_time: Instant::now(),
            startup_error: None,
        })
    }

    fn event_payload(tipo_evento: &str, timestamp: DateTime<Utc>) -> Value {
        json!({
            "evento_id": "evt-123",
            "tipo_evento": tipo_evento,
            "timestamp": timestamp.to_rfc3339(),
            "dados": {"txid": "txid-1", "valor": 150.0},
        })
    }

    async fn call(
        state: &Arc<AppState>,
        body: Vec<u8>,
        secret: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut headers = HeaderMap::new();
        if let Some(secret) = secret {
            let signature = sign(secret, &body);
            headers.insert(SIGNATURE_HEADER, signature.parse().unwrap());
        }
        let (status, Json(json)) =
            sicoob_webhook(State(state.clone()), headers, Bytes::from(body)).await;
        (status, json)
    }

    #[test]
    fn test_sign_produces_stable_hex() {
        let signature = sign("secret", b"abc");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(signature, sign("secret", b"abc"));

        assert!(verify_signature("secret", b"abc", &signature));
        assert!(verify_signature("secret", b"abc", &signature.to_uppercase()));
        assert!(!verify_signature("secret", b"abcd", &signature));
        assert!(!verify_signature("outro", b"abc", &signature));
        assert!(!verify_signature("secret", b"abc", "não-hex"));
    }

    #[tokio::test]
    async fn test_valid_event_updates_charge_and_enqueues() {
        let charges = Arc::new(MemoryCharges::default());
        charges
            .charges
            .lock()
            .unwrap()
            .insert("txid-1".into(), charge_fixture("txid-1"));
        let queue = Arc::new(MemoryQueue::default());
        let state = test_state(charges.clone(), queue.clone());

        let body = serde_json::to_vec(&event_payload("pix.received", Utc::now())).unwrap();
        let (status, json) = call(&state, body, Some(SECRET)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "processado");
        assert_eq!(json["identificador"], "txid-1");
        assert_eq!(json["notificacao"], "pagamento_recebido");

        assert_eq!(
            charges.applied.lock().unwrap().as_slice(),
            &[("txid-1".to_string(), ChargeStatus::Pago)]
        );
        assert_eq!(charges.recorded_events.lock().unwrap().len(), 1);

        let inserted = queue.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].0, "txid-1");
        assert_eq!(inserted[0].1, NotificationKind::PaymentReceived);
        assert_eq!(inserted[0].2["valor"], 150.0);
    }

    #[tokio::test]
    async fn test_bad_signature_rejected_without_writes() {
        let charges = Arc::new(MemoryCharges::default());
        let queue = Arc::new(MemoryQueue::default());
        let state = test_state(charges.clone(), queue.clone());

        let body = serde_json::to_vec(&event_payload("pix.received", Utc::now())).unwrap();
        let (status, json) = call(&state, body, Some("segredo-errado")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Assinatura inválida");
        assert!(charges.applied.lock().unwrap().is_empty());
        assert!(charges.recorded_events.lock().unwrap().is_empty());
        assert!(queue.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_signature_rejected() {
        let state = test_state(Arc::default(), Arc::default());
        let body = serde_json::to_vec(&event_payload("pix.received", Utc::now())).unwrap();
        let (status, _) = call(&state, body, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_stale_timestamp_rejected() {
        let charges = Arc::new(MemoryCharges::default());
        let state = test_state(charges.clone(), Arc::default());

        let stale = Utc::now() - chrono::Duration::minutes(10);
        let body = serde_json::to_vec(&event_payload("pix.received", stale)).unwrap();
        let (status, json) = call(&state, body, Some(SECRET)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Timestamp fora da janela aceita");
        assert!(charges.recorded_events.lock().unwrap().is_empty());

        // A timestamp too far in the future is just as suspect.
        let future = Utc::now() + chrono::Duration::minutes(10);
        let body = serde_json::to_vec(&event_payload("pix.received", future)).unwrap();
        let (status, _) = call(&state, body, Some(SECRET)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_event_tag_is_ignored() {
        let charges = Arc::new(MemoryCharges::default());
        let queue = Arc::new(MemoryQueue::default());
        let state = test_state(charges.clone(), queue.clone());

        let body = serde_json::to_vec(&event_payload("pix.renovado", Utc::now())).unwrap();
        let (status, json) = call(&state, body, Some(SECRET)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ignored"], true);
        assert_eq!(json["tipo_evento"], "pix.renovado");
        assert!(charges.applied.lock().unwrap().is_empty());
        assert!(queue.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_charge_is_ignored_but_audited() {
        let charges = Arc::new(MemoryCharges::default());
        let queue = Arc::new(MemoryQueue::default());
        let state = test_state(charges.clone(), queue.clone());

        let body = serde_json::to_vec(&event_payload("pix.received", Utc::now())).unwrap();
        let (status, json) = call(&state, body, Some(SECRET)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ignored"], true);
        assert_eq!(charges.recorded_events.lock().unwrap().len(), 1);
        assert!(charges.applied.lock().unwrap().is_empty());
        assert!(queue.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_returns_500() {
        let charges = Arc::new(MemoryCharges {
            fail_apply: true,
            ..MemoryCharges::default()
        });
        charges
            .charges
            .lock()
            .unwrap()
            .insert("txid-1".into(), charge_fixture("txid-1"));
        let state = test_state(charges, Arc::default());

        let body = serde_json::to_vec(&event_payload("pix.received", Utc::now())).unwrap();
        let (status, _) = call(&state, body, Some(SECRET)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_400() {
        let state = test_state(Arc::default(), Arc::default());
        let body = b"isto nao e json".to_vec();
        let (status, _) = call(&state, body, Some(SECRET)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_boleto_event_uses_nosso_numero() {
        let charges = Arc::new(MemoryCharges::default());
        charges
            .charges
            .lock()
            .unwrap()
            .insert("bol-9".into(), charge_fixture("bol-9"));
        let queue = Arc::new(MemoryQueue::default());
        let state = test_state(charges.clone(), queue.clone());

        let payload = json!({
            "evento_id": "evt-9",
            "tipo_evento": "boleto.expired",
            "timestamp": Utc::now().to_rfc3339(),
            "dados": {"nosso_numero": "bol-9"},
        });
        let body = serde_json::to_vec(&payload).unwrap();
        let (status, json) = call(&state, body, Some(SECRET)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["notificacao"], "boleto_vencido");
        assert_eq!(
            charges.applied.lock().unwrap().as_slice(),
            &[("bol-9".to_string(), ChargeStatus::Vencido)]
        );
    }
}
