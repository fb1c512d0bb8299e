//! HTTP server implementation using Axum.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use guiasmei_assistant::AssistantClient;
use guiasmei_channels::TwilioWhatsApp;
use guiasmei_core::config::GuiasMeiConfig;
use guiasmei_core::traits::{ChargeStore, DeliveryChannel, NotificationStore};
use guiasmei_notifier::NotificationProcessor;
use guiasmei_store::SupabaseStore;

/// Shared state for the gateway server.
///
/// Store handles are `None` when Supabase credentials are absent or
/// invalid; the gateway still serves, `/health` reports `degraded` with
/// the startup error, and store-backed routes answer 503.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GuiasMeiConfig>,
    pub notifications: Option<Arc<dyn NotificationStore>>,
    pub charges: Option<Arc<dyn ChargeStore>>,
    pub assistant: Arc<AssistantClient>,
    pub start_time: Instant,
    pub startup_error: Option<String>,
}

impl AppState {
    /// Build the shared state. A store that cannot be constructed leaves
    /// the gateway running degraded instead of aborting startup.
    pub fn from_config(config: GuiasMeiConfig) -> Self {
        let assistant = Arc::new(AssistantClient::new(&config.llm));

        let (notifications, charges, startup_error) = match SupabaseStore::new(&config.supabase) {
            Ok(store) => {
                let store = Arc::new(store);
                (
                    Some(store.clone() as Arc<dyn NotificationStore>),
                    Some(store as Arc<dyn ChargeStore>),
                    None,
                )
            }
            Err(e) => {
                tracing::warn!("⚠️ Store unavailable, gateway running degraded: {e}");
                (None, None, Some(e.to_string()))
            }
        };

        Self {
            config: Arc::new(config),
            notifications,
            charges,
            assistant,
            start_time: Instant::now(),
            startup_error,
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    build_router_from_arc(Arc::new(state))
}

pub fn build_router_from_arc(shared: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(super::routes::root))
        .route("/health", get(super::routes::health))
        .route("/health/integrations", get(super::routes::health_integrations))
        .route("/chat", post(super::routes::chat))
        .route("/webhook/sicoob", post(super::webhook::sicoob_webhook))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Start the HTTP server and, when enabled, the notification worker.
pub async fn start(config: GuiasMeiConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(config));

    if state.config.notifier.enabled {
        match state.notifications.clone() {
            Some(store) => {
                let channel: Arc<dyn DeliveryChannel> =
                    Arc::new(TwilioWhatsApp::new(state.config.twilio.clone()));
                let processor = NotificationProcessor::new(store, channel, &state.config.notifier);
                tokio::spawn(async move { processor.run().await });
            }
            None => {
                tracing::warn!("⚠️ Notification worker not started: store unavailable");
            }
        }
    } else {
        tracing::info!("📴 Notification worker disabled by config");
    }

    let app = build_router_from_arc(state.clone());
    let addr = format!("{}:{}", state.config.gateway.host, state.config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 GuiasMEI gateway listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
