//! Domain types shared across the GuiasMEI backend.
//!
//! The record/charge structs mirror the Supabase row shapes (Portuguese
//! column names), so they serialize straight into PostgREST requests.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Outbound notification kind, stored as a snake_case tag in
/// `sicoob_notificacoes.tipo_notificacao`.
///
/// Tags not produced by the webhook intake deserialize to `Unknown` and
/// render through the generic template instead of failing the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    PaymentReceived,
    PaymentReturned,
    InvoicePaid,
    InvoiceOverdue,
    ChargePaid,
    ChargeCancelled,
    Unknown(String),
}

impl NotificationKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "pagamento_recebido" => Self::PaymentReceived,
            "pagamento_devolvido" => Self::PaymentReturned,
            "boleto_pago" => Self::InvoicePaid,
            "boleto_vencido" => Self::InvoiceOverdue,
            "cobranca_paga" => Self::ChargePaid,
            "cobranca_cancelada" => Self::ChargeCancelled,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::PaymentReceived => "pagamento_recebido",
            Self::PaymentReturned => "pagamento_devolvido",
            Self::InvoicePaid => "boleto_pago",
            Self::InvoiceOverdue => "boleto_vencido",
            Self::ChargePaid => "cobranca_paga",
            Self::ChargeCancelled => "cobranca_cancelada",
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<String> for NotificationKind {
    fn from(s: String) -> Self {
        Self::from_tag(&s)
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_tag().to_string()
    }
}

/// Delivery status of a notification record.
///
/// Pending → Sent is terminal. A failed dispatch keeps the record Pending
/// while retry budget remains; the third failure moves it to Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationStatus {
    #[serde(rename = "PENDENTE")]
    Pending,
    #[serde(rename = "ENVIADA")]
    Sent,
    #[serde(rename = "FALHOU")]
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDENTE",
            Self::Sent => "ENVIADA",
            Self::Failed => "FALHOU",
        }
    }
}

/// Charge status written by the webhook intake.
///
/// The `Charge` struct keeps its `status` column as a plain string (rows
/// predating this service may carry other tags); this enum covers only
/// the statuses this backend writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeStatus {
    #[serde(rename = "PENDENTE")]
    Pendente,
    #[serde(rename = "PAGO")]
    Pago,
    #[serde(rename = "DEVOLVIDO")]
    Devolvido,
    #[serde(rename = "VENCIDO")]
    Vencido,
    #[serde(rename = "CANCELADO")]
    Cancelado,
}

impl ChargeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendente => "PENDENTE",
            Self::Pago => "PAGO",
            Self::Devolvido => "DEVOLVIDO",
            Self::Vencido => "VENCIDO",
            Self::Cancelado => "CANCELADO",
        }
    }
}

/// A billing charge row (`sicoob_cobrancas`): PIX charge or boleto.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Charge {
    /// PIX txid or boleto nosso_numero.
    pub identificador: String,
    /// "PIX_IMEDIATA", "PIX_VENCIMENTO", or "BOLETO".
    #[serde(default)]
    pub tipo: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub pagador_nome: Option<String>,
    #[serde(default)]
    pub pagador_cpf_cnpj: Option<String>,
    /// Recipient address for notifications ("+5511999999999" or already
    /// prefixed "whatsapp:+55...").
    #[serde(default)]
    pub pagador_whatsapp: Option<String>,
    #[serde(default)]
    pub valor_original: Option<f64>,
    #[serde(default)]
    pub valor_pago: Option<f64>,
    #[serde(default)]
    pub data_vencimento: Option<NaiveDate>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    /// Event history appended by the webhook intake (JSON array).
    #[serde(default)]
    pub historico: Option<serde_json::Value>,
    #[serde(default)]
    pub criado_em: Option<DateTime<Utc>>,
    #[serde(default)]
    pub atualizado_em: Option<DateTime<Utc>>,
}

/// An outbound notification row (`sicoob_notificacoes`), optionally joined
/// with its charge via the PostgREST embedded select.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub identificador_cobranca: String,
    pub tipo_notificacao: NotificationKind,
    pub status: NotificationStatus,
    #[serde(default)]
    pub tentativas: u32,
    #[serde(default)]
    pub dados_notificacao: serde_json::Value,
    /// Joined charge (`cobranca:sicoob_cobrancas!identificador_cobranca`).
    #[serde(default)]
    pub cobranca: Option<Charge>,
    #[serde(default)]
    pub criado_em: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ultima_tentativa: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processado_em: Option<DateTime<Utc>>,
    #[serde(default)]
    pub erro_mensagem: Option<String>,
}

/// Result of one WhatsApp dispatch attempt.
///
/// `NotConfigured` keeps the loop runnable in degraded/test environments
/// without ever being mistaken for a real send: only `Delivered` carries a
/// provider-assigned message SID and only `Delivered` marks a record sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered { message_sid: String },
    NotConfigured,
    ProviderError { reason: String },
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Payment-provider webhook payload (wire shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEvent {
    pub evento_id: String,
    pub tipo_evento: String,
    /// RFC 3339 emission time, checked against the replay window.
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub dados: serde_json::Value,
}

impl BillingEvent {
    /// Charge identifier for this event. The field name depends on the
    /// event family: `txid` for PIX, `nosso_numero` for boleto, `id` for
    /// generic charges.
    pub fn identifier(&self) -> Option<&str> {
        let kind = BillingEventKind::from_tag(&self.tipo_evento)?;
        self.dados.get(kind.identifier_field()).and_then(|v| v.as_str())
    }

    pub fn amount(&self) -> Option<f64> {
        self.dados.get("valor").and_then(|v| v.as_f64())
    }
}

/// Closed set of billing events accepted by the webhook intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingEventKind {
    PixReceived,
    PixReturned,
    BoletoPaid,
    BoletoExpired,
    CobrancaPaid,
    CobrancaCancelled,
}

impl BillingEventKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "pix.received" => Some(Self::PixReceived),
            "pix.returned" => Some(Self::PixReturned),
            "boleto.paid" => Some(Self::BoletoPaid),
            "boleto.expired" => Some(Self::BoletoExpired),
            "cobranca.paid" => Some(Self::CobrancaPaid),
            "cobranca.cancelled" => Some(Self::CobrancaCancelled),
            _ => None,
        }
    }

    /// Tag persisted in `sicoob_webhook_events.tipo_evento`.
    pub fn as_persisted_tag(&self) -> &'static str {
        match self {
            Self::PixReceived => "pix_received",
            Self::PixReturned => "pix_returned",
            Self::BoletoPaid => "boleto_paid",
            Self::BoletoExpired => "boleto_expired",
            Self::CobrancaPaid => "cobranca_paid",
            Self::CobrancaCancelled => "cobranca_cancelled",
        }
    }

    /// Payload field holding the charge identifier.
    pub fn identifier_field(&self) -> &'static str {
        match self {
            Self::PixReceived | Self::PixReturned => "txid",
            Self::BoletoPaid | Self::BoletoExpired => "nosso_numero",
            Self::CobrancaPaid | Self::CobrancaCancelled => "id",
        }
    }

    /// Charge status this event transitions the charge to.
    pub fn charge_status(&self) -> ChargeStatus {
        match self {
            Self::PixReceived | Self::BoletoPaid | Self::CobrancaPaid => ChargeStatus::Pago,
            Self::PixReturned => ChargeStatus::Devolvido,
            Self::BoletoExpired => ChargeStatus::Vencido,
            Self::CobrancaCancelled => ChargeStatus::Cancelado,
        }
    }

    /// Notification kind enqueued for this event.
    pub fn notification_kind(&self) -> NotificationKind {
        match self {
            Self::PixReceived => NotificationKind::PaymentReceived,
            Self::PixReturned => NotificationKind::PaymentReturned,
            Self::BoletoPaid => NotificationKind::InvoicePaid,
            Self::BoletoExpired => NotificationKind::InvoiceOverdue,
            Self::CobrancaPaid => NotificationKind::ChargePaid,
            Self::CobrancaCancelled => NotificationKind::ChargeCancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_kind_tags() {
        assert_eq!(
            NotificationKind::from_tag("pagamento_recebido"),
            NotificationKind::PaymentReceived
        );
        assert_eq!(NotificationKind::PaymentReceived.as_tag(), "pagamento_recebido");
        assert_eq!(
            NotificationKind::from_tag("algo_novo"),
            NotificationKind::Unknown("algo_novo".into())
        );
        assert_eq!(NotificationKind::Unknown("algo_novo".into()).as_tag(), "algo_novo");
    }

    #[test]
    fn test_notification_kind_serde_round_trip() {
        let json = serde_json::to_string(&NotificationKind::InvoicePaid).unwrap();
        assert_eq!(json, "\"boleto_pago\"");
        let back: NotificationKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, NotificationKind::InvoicePaid);

        let unknown: NotificationKind = serde_json::from_str("\"promo_natal\"").unwrap();
        assert_eq!(unknown, NotificationKind::Unknown("promo_natal".into()));
    }

    #[test]
    fn test_notification_status_tags() {
        let json = serde_json::to_string(&NotificationStatus::Sent).unwrap();
        assert_eq!(json, "\"ENVIADA\"");
        let back: NotificationStatus = serde_json::from_str("\"PENDENTE\"").unwrap();
        assert_eq!(back, NotificationStatus::Pending);
        assert_eq!(NotificationStatus::Failed.as_str(), "FALHOU");
    }

    #[test]
    fn test_billing_event_classification() {
        let kind = BillingEventKind::from_tag("pix.received").unwrap();
        assert_eq!(kind.charge_status(), ChargeStatus::Pago);
        assert_eq!(kind.notification_kind(), NotificationKind::PaymentReceived);
        assert_eq!(kind.identifier_field(), "txid");

        let kind = BillingEventKind::from_tag("boleto.expired").unwrap();
        assert_eq!(kind.charge_status(), ChargeStatus::Vencido);
        assert_eq!(kind.identifier_field(), "nosso_numero");

        assert!(BillingEventKind::from_tag("pix.unknown").is_none());
    }

    #[test]
    fn test_billing_event_identifier() {
        let event = BillingEvent {
            evento_id: "evt-1".into(),
            tipo_evento: "cobranca.cancelled".into(),
            timestamp: Utc::now(),
            dados: serde_json::json!({"id": "cob-42", "motivo": "desistência"}),
        };
        assert_eq!(event.identifier(), Some("cob-42"));

        let bad = BillingEvent {
            evento_id: "evt-2".into(),
            tipo_evento: "pix.received".into(),
            timestamp: Utc::now(),
            dados: serde_json::json!({"nosso_numero": "123"}),
        };
        assert_eq!(bad.identifier(), None);
    }

    #[test]
    fn test_record_deserializes_with_joined_charge() {
        let row = serde_json::json!({
            "id": "8e2f6d7a-0001-4b5c-9f00-aaaaaaaaaaaa",
            "identificador_cobranca": "txid-123",
            "tipo_notificacao": "pagamento_recebido",
            "status": "PENDENTE",
            "tentativas": 0,
            "dados_notificacao": {"valor": 125.5},
            "criado_em": "2026-03-01T12:00:00Z",
            "cobranca": {
                "identificador": "txid-123",
                "tipo": "PIX_IMEDIATA",
                "status": "PAGO",
                "pagador_whatsapp": "+5511999999999",
                "valor_original": 125.5,
                "data_vencimento": "2026-03-10"
            }
        });
        let record: NotificationRecord = serde_json::from_value(row).unwrap();
        assert_eq!(record.tipo_notificacao, NotificationKind::PaymentReceived);
        assert_eq!(record.status, NotificationStatus::Pending);
        let charge = record.cobranca.unwrap();
        assert_eq!(charge.pagador_whatsapp.as_deref(), Some("+5511999999999"));
        assert_eq!(charge.valor_original, Some(125.5));
    }
}
