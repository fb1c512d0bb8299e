//! GuiasMEI configuration system.
//!
//! Settings are loaded once at process start (TOML file + environment
//! overrides) and passed by reference to every component. There is no
//! lazily-constructed global.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GuiasMeiConfig {
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub twilio: TwilioConfig,
    #[serde(default)]
    pub sicoob: SicoobConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
    #[serde(default)]
    pub nfse: NfseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

impl GuiasMeiConfig {
    /// Load config from the default path (~/.guiasmei/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::GuiasMeiError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::GuiasMeiError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GuiasMeiError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Apply environment variable overrides. Env wins over file values,
    /// so deployments can run without any config file at all.
    pub fn apply_env(&mut self) {
        fn take(var: &str, slot: &mut String) {
            if let Ok(v) = std::env::var(var)
                && !v.is_empty()
            {
                *slot = v;
            }
        }

        take("SUPABASE_URL", &mut self.supabase.url);
        take("SUPABASE_ANON_KEY", &mut self.supabase.anon_key);
        take("SUPABASE_SERVICE_ROLE_KEY", &mut self.supabase.service_key);

        take("TWILIO_ACCOUNT_SID", &mut self.twilio.account_sid);
        take("TWILIO_AUTH_TOKEN", &mut self.twilio.auth_token);
        take("TWILIO_WHATSAPP_NUMBER", &mut self.twilio.whatsapp_from);

        take("SICOOB_WEBHOOK_SECRET", &mut self.sicoob.webhook_secret);

        take("STRIPE_SECRET_KEY", &mut self.stripe.secret_key);
        take("STRIPE_WEBHOOK_SECRET", &mut self.stripe.webhook_secret);

        take("NFSE_CERTIFICATE_PATH", &mut self.nfse.certificate_path);
        take("NFSE_CERTIFICATE_PASSWORD", &mut self.nfse.certificate_password);
        take("ADN_NFSE_CONTRIBUINTES_URL", &mut self.nfse.contribuintes_url);
        take("ADN_NFSE_PARAMETROS_URL", &mut self.nfse.parametros_url);
        take("ADN_NFSE_DANFSE_URL", &mut self.nfse.danfse_url);
        take("NFSE_ENVIRONMENT", &mut self.nfse.environment);

        take("OPENAI_API_KEY", &mut self.llm.api_key);
        take("OPENAI_BASE_URL", &mut self.llm.endpoint);
        take("OPENAI_MODEL", &mut self.llm.model);

        take("GUIASMEI_HOST", &mut self.gateway.host);
        if let Ok(v) = std::env::var("GUIASMEI_PORT")
            && let Ok(port) = v.parse()
        {
            self.gateway.port = port;
        }
    }

    /// Load from the default path and apply environment overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env();
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".guiasmei")
            .join("config.toml")
    }

    /// Get the GuiasMEI home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".guiasmei")
    }
}

/// Supabase (PostgREST + storage) configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SupabaseConfig {
    /// Project URL, e.g. "https://xyz.supabase.co".
    #[serde(default)]
    pub url: String,
    /// Service-role key used by the backend (server-side only).
    #[serde(default)]
    pub service_key: String,
    /// Anonymous key, used only for the readiness REST probe.
    #[serde(default)]
    pub anon_key: String,
}

impl SupabaseConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.service_key.is_empty()
    }
}

/// Twilio WhatsApp configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TwilioConfig {
    /// Account SID ("AC..." from the Twilio console).
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    /// Sender address, e.g. "whatsapp:+14155238886".
    #[serde(default)]
    pub whatsapp_from: String,
}

impl TwilioConfig {
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.whatsapp_from.is_empty()
    }
}

/// Sicoob webhook intake configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SicoobConfig {
    /// Shared secret for the HMAC-SHA256 webhook signature.
    #[serde(default)]
    pub webhook_secret: String,
    /// Replay window for webhook timestamps, in seconds.
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: u64,
}

fn default_webhook_tolerance() -> u64 { 300 }

impl Default for SicoobConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            webhook_tolerance_secs: default_webhook_tolerance(),
        }
    }
}

/// Stripe configuration (card payments, checked by the readiness report).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StripeConfig {
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub webhook_secret: String,
}

/// NFSe/ADN gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NfseConfig {
    #[serde(default)]
    pub contribuintes_url: String,
    #[serde(default)]
    pub parametros_url: String,
    #[serde(default)]
    pub danfse_url: String,
    /// Path to the A1 certificate file.
    #[serde(default)]
    pub certificate_path: String,
    #[serde(default)]
    pub certificate_password: String,
    #[serde(default = "default_nfse_environment")]
    pub environment: String,
}

fn default_nfse_environment() -> String { "homolog".into() }

impl Default for NfseConfig {
    fn default() -> Self {
        Self {
            contribuintes_url: String::new(),
            parametros_url: String::new(),
            danfse_url: String::new(),
            certificate_path: String::new(),
            certificate_password: String::new(),
            environment: default_nfse_environment(),
        }
    }
}

/// Conversational assistant (OpenAI-compatible endpoint) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_endpoint() -> String { "https://api.openai.com/v1".into() }
fn default_llm_model() -> String { "gpt-4o-mini".into() }
fn default_llm_temperature() -> f32 { 0.7 }
fn default_llm_max_tokens() -> u32 { 1024 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
        }
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8000 }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Notification delivery loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Run the delivery loop alongside the gateway.
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Maximum records fetched per poll cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Seconds to sleep between poll cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Seconds to sleep after a failed fetch before retrying the cycle.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
}

fn bool_true() -> bool { true }
fn default_batch_size() -> u32 { 50 }
fn default_poll_interval() -> u64 { 30 }
fn default_error_backoff() -> u64 { 60 }

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: default_batch_size(),
            poll_interval_secs: default_poll_interval(),
            error_backoff_secs: default_error_backoff(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GuiasMeiConfig::default();
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.notifier.batch_size, 50);
        assert_eq!(config.notifier.poll_interval_secs, 30);
        assert_eq!(config.notifier.error_backoff_secs, 60);
        assert_eq!(config.sicoob.webhook_tolerance_secs, 300);
        assert!(!config.supabase.is_configured());
        assert!(!config.twilio.is_configured());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [supabase]
            url = "https://abc.supabase.co"
            service_key = "service-role-key"

            [twilio]
            account_sid = "AC123"
            auth_token = "token"
            whatsapp_from = "whatsapp:+14155238886"

            [notifier]
            poll_interval_secs = 5
        "#;

        let config: GuiasMeiConfig = toml::from_str(toml_str).unwrap();
        assert!(config.supabase.is_configured());
        assert!(config.twilio.is_configured());
        assert_eq!(config.notifier.poll_interval_secs, 5);
        // Untouched sections keep their defaults
        assert_eq!(config.notifier.batch_size, 50);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: GuiasMeiConfig = toml::from_str("").unwrap();
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.nfse.environment, "homolog");
        assert_eq!(config.llm.endpoint, "https://api.openai.com/v1");
    }

    #[test]
    fn test_home_dir() {
        let home = GuiasMeiConfig::home_dir();
        assert!(home.to_string_lossy().contains("guiasmei"));
    }
}
