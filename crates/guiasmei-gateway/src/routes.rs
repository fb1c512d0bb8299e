//! API route handlers for the gateway.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;

use guiasmei_assistant::UserProfile;
use guiasmei_checkup::CredentialChecker;

use super::server::AppState;

/// Service banner.
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "GuiasMEI API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "online",
    }))
}

/// Liveness endpoint. Reports `degraded` when a dependency failed to
/// build at startup; the process itself is still serving.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = state.start_time.elapsed().as_secs();
    match &state.startup_error {
        None => Json(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": uptime,
        })),
        Some(error) => Json(serde_json::json!({
            "status": "degraded",
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": uptime,
            "error": error,
        })),
    }
}

/// Readiness report over every external integration. Advisory only;
/// never gates request handling.
pub async fn health_integrations(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let checker = CredentialChecker::new(&state.config);
    let report = checker.run_all().await;

    Json(serde_json::json!({
        "conformity": report.conformity(),
        "recommendations": report.recommendations(),
        "report": report,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// "mei", "autonomo", "parceiro", "admin"; anything else falls back
    /// to the default profile.
    #[serde(default)]
    pub profile: Option<String>,
    /// Free-form user context rendered into the prompt.
    #[serde(default)]
    pub context: serde_json::Value,
}

/// Assistant chat endpoint.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    if body.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Mensagem vazia"})),
        ));
    }

    let profile = body
        .profile
        .as_deref()
        .map(UserProfile::from_tag)
        .unwrap_or_default();

    let reply = state
        .assistant
        .reply(profile, &body.message, &body.context)
        .await;

    Ok(Json(serde_json::json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "profile": profile.as_tag(),
        "reply": reply,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use guiasmei_assistant::FALLBACK_REPLY;
    use guiasmei_core::config::GuiasMeiConfig;

    fn test_state() -> State<Arc<AppState>> {
        State(Arc::new(AppState::from_config(GuiasMeiConfig::default())))
    }

    #[tokio::test]
    async fn test_root_banner() {
        let json = root().await.0;
        assert_eq!(json["service"], "GuiasMEI API");
        assert_eq!(json["status"], "online");
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn test_health_reports_degraded_without_store() {
        let json = health(test_state()).await.0;
        assert_eq!(json["status"], "degraded");
        assert!(json["error"].as_str().unwrap().contains("Supabase"));
        assert!(json["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn test_health_ok_with_store_credentials() {
        let mut config = GuiasMeiConfig::default();
        config.supabase.url = "https://abc.supabase.co".into();
        config.supabase.service_key = "service-role-key".into();

        let state = State(Arc::new(AppState::from_config(config)));
        let json = health(state).await.0;
        assert_eq!(json["status"], "ok");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let request = ChatRequest {
            message: "   ".into(),
            profile: None,
            context: serde_json::Value::Null,
        };
        let result = chat(test_state(), Json(request)).await;
        let (status, _) = result.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_falls_back_without_llm_key() {
        let request = ChatRequest {
            message: "Quanto é o DAS este mês?".into(),
            profile: Some("mei".into()),
            context: serde_json::json!({"nome": "Maria"}),
        };
        let json = chat(test_state(), Json(request)).await.unwrap().0;
        assert_eq!(json["reply"], FALLBACK_REPLY);
        assert_eq!(json["profile"], "mei");
        assert!(json["id"].is_string());
    }

    #[tokio::test]
    async fn test_chat_unknown_profile_uses_default() {
        let request = ChatRequest {
            message: "Oi".into(),
            profile: Some("contador-chefe".into()),
            context: serde_json::Value::Null,
        };
        let json = chat(test_state(), Json(request)).await.unwrap().0;
        assert_eq!(json["profile"], "default");
    }
}
