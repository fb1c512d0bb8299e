//! Twilio WhatsApp delivery channel.
//!
//! Dispatches rendered notifications through the Twilio Messages API.
//! Requires: Account SID + Auth Token + a WhatsApp-enabled sender number.

use async_trait::async_trait;
use serde_json::Value;

use guiasmei_core::config::TwilioConfig;
use guiasmei_core::error::{GuiasMeiError, Result};
use guiasmei_core::traits::DeliveryChannel;
use guiasmei_core::types::SendOutcome;

/// Twilio WhatsApp channel implementation.
pub struct TwilioWhatsApp {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioWhatsApp {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        )
    }

    async fn dispatch(&self, to: &str, body: &str, media_url: Option<&str>) -> Result<SendOutcome> {
        if !self.is_configured() {
            return Ok(SendOutcome::NotConfigured);
        }

        let recipient = normalize_recipient(to);
        let sender = normalize_recipient(&self.config.whatsapp_from);

        let mut form = vec![
            ("From", sender.clone()),
            ("To", recipient.clone()),
            ("Body", body.to_string()),
        ];
        if let Some(url) = media_url {
            form.push(("MediaUrl", url.to_string()));
        }

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| GuiasMeiError::Channel(format!("Twilio request failed: {e}")))?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let payload: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        let outcome = interpret_response(status, &payload);
        if let SendOutcome::Delivered { message_sid } = &outcome {
            tracing::debug!("Twilio message accepted: {} → {}", message_sid, recipient);
        }
        Ok(outcome)
    }
}

/// Twilio expects WhatsApp addresses as "whatsapp:+5511...".
fn normalize_recipient(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{number}")
    }
}

/// Map a Twilio HTTP response to a send outcome.
///
/// A 2xx answer carries the created message resource; anything else is a
/// provider rejection with `code`/`message` fields when Twilio produced
/// them, or the bare HTTP status when it did not.
fn interpret_response(status: u16, payload: &Value) -> SendOutcome {
    if (200..300).contains(&status) {
        if let Some(sid) = payload.get("sid").and_then(|v| v.as_str()) {
            return SendOutcome::Delivered {
                message_sid: sid.to_string(),
            };
        }
        return SendOutcome::ProviderError {
            reason: "Twilio response missing message SID".into(),
        };
    }

    let reason = match payload.get("message").and_then(|v| v.as_str()) {
        Some(message) => match payload.get("code").and_then(|c| c.as_i64()) {
            Some(code) => format!("Twilio {code}: {message}"),
            None => message.to_string(),
        },
        None => format!("Twilio HTTP {status}"),
    };
    SendOutcome::ProviderError { reason }
}

#[async_trait]
impl DeliveryChannel for TwilioWhatsApp {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn send(&self, to: &str, body: &str) -> Result<SendOutcome> {
        self.dispatch(to, body, None).await
    }

    async fn send_media(&self, to: &str, body: &str, media_url: &str) -> Result<SendOutcome> {
        self.dispatch(to, body, Some(media_url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_recipient() {
        assert_eq!(normalize_recipient("+5511999999999"), "whatsapp:+5511999999999");
        assert_eq!(
            normalize_recipient("whatsapp:+5511999999999"),
            "whatsapp:+5511999999999"
        );
    }

    #[test]
    fn test_interpret_created_message() {
        let payload = json!({"sid": "SM123", "status": "queued"});
        let outcome = interpret_response(201, &payload);
        assert_eq!(
            outcome,
            SendOutcome::Delivered {
                message_sid: "SM123".into()
            }
        );
    }

    #[test]
    fn test_interpret_success_without_sid() {
        let outcome = interpret_response(200, &json!({"status": "queued"}));
        assert!(matches!(outcome, SendOutcome::ProviderError { .. }));
    }

    #[test]
    fn test_interpret_rejection_with_code() {
        let payload = json!({"code": 21211, "message": "Invalid 'To' phone number"});
        let outcome = interpret_response(400, &payload);
        assert_eq!(
            outcome,
            SendOutcome::ProviderError {
                reason: "Twilio 21211: Invalid 'To' phone number".into()
            }
        );
    }

    #[test]
    fn test_interpret_rejection_without_body() {
        let outcome = interpret_response(503, &Value::Null);
        assert_eq!(
            outcome,
            SendOutcome::ProviderError {
                reason: "Twilio HTTP 503".into()
            }
        );
    }

    #[tokio::test]
    async fn test_unconfigured_channel_short_circuits() {
        let channel = TwilioWhatsApp::new(TwilioConfig::default());
        let outcome = channel.send("+5511999999999", "olá").await.unwrap();
        assert_eq!(outcome, SendOutcome::NotConfigured);

        let outcome = channel
            .send_media("+5511999999999", "olá", "https://cdn.example/doc.pdf")
            .await
            .unwrap();
        assert_eq!(outcome, SendOutcome::NotConfigured);
    }
}
