//! OpenAI-compatible chat client.

use serde_json::{json, Value};

use guiasmei_core::config::LlmConfig;
use guiasmei_core::error::{GuiasMeiError, Result};

use crate::prompts::{context_block, system_prompt, UserProfile};

/// Returned whenever the assistant cannot produce a real completion.
pub const FALLBACK_REPLY: &str = "Desculpe, o assistente está temporariamente indisponível. \
Tente novamente em alguns minutos ou fale com o suporte GuiasMEI.";

pub struct AssistantClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl AssistantClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            config: config.clone(),
            client: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    /// Answer one user message. Degrades to [`FALLBACK_REPLY`] when the
    /// endpoint is unconfigured or errors, so the chat route never 500s
    /// because of the LLM.
    pub async fn reply(&self, profile: UserProfile, message: &str, context: &Value) -> String {
        if !self.is_configured() {
            tracing::warn!("⚠️ Assistant called without an API key, returning fallback reply");
            return FALLBACK_REPLY.to_string();
        }

        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": [
                { "role": "system", "content": system_prompt(profile, &[]) },
                { "role": "user", "content": context_block(message, context) },
            ],
        });

        match self.chat(&body).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("❌ Assistant request failed: {e}");
                FALLBACK_REPLY.to_string()
            }
        }
    }

    async fn chat(&self, body: &Value) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| GuiasMeiError::Http(format!("LLM connection failed ({url}): {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GuiasMeiError::Provider(format!(
                "LLM API error {status}: {text}"
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| GuiasMeiError::Http(e.to_string()))?;

        let content = json["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| GuiasMeiError::Provider("No completion in response".into()))?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unconfigured_client_returns_fallback() {
        let client = AssistantClient::new(&LlmConfig::default());
        assert!(!client.is_configured());

        let reply = client
            .reply(UserProfile::Mei, "Quanto é o DAS?", &json!({}))
            .await;
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_returns_fallback() {
        let config = LlmConfig {
            api_key: "sk-test".into(),
            endpoint: "http://127.0.0.1:1/v1".into(),
            ..LlmConfig::default()
        };
        let client = AssistantClient::new(&config);
        assert!(client.is_configured());

        let reply = client.reply(UserProfile::Default, "Oi", &json!({})).await;
        assert_eq!(reply, FALLBACK_REPLY);
    }
}
