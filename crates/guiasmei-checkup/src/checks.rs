//! One readiness check per external integration.
//!
//! Checks read the configuration struct they are handed; only the CI/CD
//! check looks at deploy-platform environment variables directly. Live
//! probes (Supabase REST and storage) use a 10s timeout and degrade to a
//! warning when the network itself fails.

use std::path::Path;

use serde::Serialize;

use guiasmei_core::GuiasMeiConfig;

use crate::storage::BUCKET_SPECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckOutcome {
    Ok,
    Warning,
    Error,
}

impl CheckOutcome {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Ok => "✓",
            Self::Warning => "-",
            Self::Error => "✗",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckItem {
    pub label: String,
    pub outcome: CheckOutcome,
    pub detail: String,
}

impl CheckItem {
    fn ok(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            outcome: CheckOutcome::Ok,
            detail: detail.into(),
        }
    }

    fn warning(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            outcome: CheckOutcome::Warning,
            detail: detail.into(),
        }
    }

    fn error(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            outcome: CheckOutcome::Error,
            detail: detail.into(),
        }
    }
}

/// Result of checking one integration. `ok` follows the module's own
/// pass rule, not a blanket "every item green".
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationCheck {
    pub name: &'static str,
    pub ok: bool,
    pub items: Vec<CheckItem>,
}

/// Mask a secret for display: a short prefix plus `***`.
pub fn mask(secret: &str, keep: usize) -> String {
    let prefix: String = secret.chars().take(keep).collect();
    format!("{prefix}***")
}

pub struct CredentialChecker<'a> {
    config: &'a GuiasMeiConfig,
    client: reqwest::Client,
}

impl<'a> CredentialChecker<'a> {
    pub fn new(config: &'a GuiasMeiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    pub async fn run_all(&self) -> crate::report::CredentialReport {
        let integrations = vec![
            self.check_supabase().await,
            self.check_nfse(),
            self.check_stripe(),
            self.check_twilio(),
            self.check_cicd(),
        ];
        crate::report::CredentialReport::new(integrations)
    }

    /// Supabase passes only when the live REST probe answers; bucket
    /// probes are informational.
    pub async fn check_supabase(&self) -> IntegrationCheck {
        let supabase = &self.config.supabase;
        let mut items = Vec::new();

        if supabase.url.is_empty() {
            items.push(CheckItem::error("SUPABASE_URL", "não configurada"));
        }
        if supabase.anon_key.is_empty() {
            items.push(CheckItem::error("SUPABASE_ANON_KEY", "não configurada"));
        }
        if supabase.service_key.is_empty() {
            items.push(CheckItem::error("SUPABASE_SERVICE_ROLE_KEY", "não configurada"));
        }
        if !items.is_empty() {
            return IntegrationCheck { name: "supabase", ok: false, items };
        }

        items.push(CheckItem::ok("SUPABASE_URL", &supabase.url));
        items.push(CheckItem::ok("SUPABASE_ANON_KEY", mask(&supabase.anon_key, 20)));
        items.push(CheckItem::ok(
            "SUPABASE_SERVICE_ROLE_KEY",
            mask(&supabase.service_key, 20),
        ));

        let base = supabase.url.trim_end_matches('/');
        let probe_url = format!("{base}/rest/v1/usuarios?select=count&limit=1");
        let rest_ok = match self
            .client
            .get(&probe_url)
            .header("apikey", &supabase.anon_key)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == 200 || status == 206 {
                    items.push(CheckItem::ok(
                        "Conexão REST",
                        format!("validada (status {status})"),
                    ));
                    true
                } else {
                    items.push(CheckItem::error(
                        "Conexão REST",
                        format!("falhou (status {status})"),
                    ));
                    false
                }
            }
            Err(e) => {
                tracing::debug!("Supabase REST probe error: {e}");
                items.push(CheckItem::warning("Conexão REST", format!("erro de rede: {e}")));
                false
            }
        };

        for (bucket, _) in BUCKET_SPECS {
            let bucket_url = format!("{base}/storage/v1/bucket/{bucket}");
            match self
                .client
                .get(&bucket_url)
                .header("apikey", &supabase.service_key)
                .header("Authorization", format!("Bearer {}", supabase.service_key))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    items.push(CheckItem::ok(format!("Bucket '{bucket}'"), "existe"));
                }
                Ok(response) => {
                    items.push(CheckItem::error(
                        format!("Bucket '{bucket}'"),
                        format!("não encontrado (status {})", response.status().as_u16()),
                    ));
                }
                Err(e) => {
                    tracing::debug!("bucket probe '{bucket}' error: {e}");
                    items.push(CheckItem::warning(
                        format!("Bucket '{bucket}'"),
                        format!("erro de rede: {e}"),
                    ));
                }
            }
        }

        IntegrationCheck { name: "supabase", ok: rest_ok, items }
    }

    /// NFSe passes when at least one ADN endpoint is configured; the A1
    /// certificate material is advisory.
    pub fn check_nfse(&self) -> IntegrationCheck {
        let nfse = &self.config.nfse;
        let mut items = Vec::new();

        let urls = [
            ("ADN_NFSE_CONTRIBUINTES_URL", "Contribuintes", &nfse.contribuintes_url),
            ("ADN_NFSE_PARAMETROS_URL", "Parâmetros", &nfse.parametros_url),
            ("ADN_NFSE_DANFSE_URL", "DANFSe", &nfse.danfse_url),
        ];
        let mut any_url = false;
        for (label, desc, value) in urls {
            if value.is_empty() {
                items.push(CheckItem::error(label, format!("({desc}) não configurada")));
            } else {
                any_url = true;
                items.push(CheckItem::ok(label, format!("({desc}) {value}")));
            }
        }

        if nfse.certificate_path.is_empty() {
            items.push(CheckItem::warning("NFSE_CERTIFICATE_PATH", "não configurada"));
        } else {
            items.push(CheckItem::ok("NFSE_CERTIFICATE_PATH", &nfse.certificate_path));
            if Path::new(&nfse.certificate_path).exists() {
                items.push(CheckItem::ok("Certificado A1", "arquivo encontrado localmente"));
            } else {
                items.push(CheckItem::warning(
                    "Certificado A1",
                    format!("arquivo não encontrado em {}", nfse.certificate_path),
                ));
            }
        }

        if nfse.certificate_password.is_empty() {
            items.push(CheckItem::warning("NFSE_CERTIFICATE_PASSWORD", "não configurada"));
        } else {
            items.push(CheckItem::ok("NFSE_CERTIFICATE_PASSWORD", "configurada (***)"));
        }

        items.push(CheckItem::ok("Ambiente", &nfse.environment));

        IntegrationCheck { name: "nfse", ok: any_url, items }
    }

    /// Stripe passes with both the secret key and the webhook secret.
    pub fn check_stripe(&self) -> IntegrationCheck {
        let stripe = &self.config.stripe;
        let mut items = Vec::new();

        if stripe.secret_key.is_empty() {
            items.push(CheckItem::error("STRIPE_SECRET_KEY", "não configurada"));
        } else {
            items.push(CheckItem::ok(
                "STRIPE_SECRET_KEY",
                format!("configurada ({})", mask(&stripe.secret_key, 10)),
            ));
            if stripe.secret_key.starts_with("sk_test_") {
                items.push(CheckItem::ok("Modo", "TESTE"));
            } else if stripe.secret_key.starts_with("sk_live_") {
                items.push(CheckItem::warning("Modo", "PRODUÇÃO (cuidado!)"));
            } else {
                items.push(CheckItem::warning("Modo", "prefixo de chave desconhecido"));
            }
        }

        if stripe.webhook_secret.is_empty() {
            items.push(CheckItem::error("STRIPE_WEBHOOK_SECRET", "não configurada"));
        } else {
            items.push(CheckItem::ok(
                "STRIPE_WEBHOOK_SECRET",
                format!("configurada ({})", mask(&stripe.webhook_secret, 10)),
            ));
        }

        let ok = !stripe.secret_key.is_empty() && !stripe.webhook_secret.is_empty();
        IntegrationCheck { name: "stripe", ok, items }
    }

    /// Twilio passes with SID, auth token and WhatsApp number present.
    pub fn check_twilio(&self) -> IntegrationCheck {
        let twilio = &self.config.twilio;
        let mut items = Vec::new();

        if twilio.account_sid.is_empty() {
            items.push(CheckItem::error("TWILIO_ACCOUNT_SID", "não configurada"));
        } else {
            items.push(CheckItem::ok("TWILIO_ACCOUNT_SID", &twilio.account_sid));
            if !twilio.account_sid.starts_with("AC") {
                items.push(CheckItem::warning(
                    "Formato do SID",
                    "prefixo inesperado (esperado AC...)",
                ));
            }
        }

        if twilio.auth_token.is_empty() {
            items.push(CheckItem::error("TWILIO_AUTH_TOKEN", "não configurada"));
        } else {
            items.push(CheckItem::ok("TWILIO_AUTH_TOKEN", mask(&twilio.auth_token, 10)));
        }

        if twilio.whatsapp_from.is_empty() {
            items.push(CheckItem::error("TWILIO_WHATSAPP_NUMBER", "não configurada"));
        } else {
            items.push(CheckItem::ok("TWILIO_WHATSAPP_NUMBER", &twilio.whatsapp_from));
            let number = twilio.whatsapp_from.trim_start_matches("whatsapp:");
            if !number.starts_with('+') {
                items.push(CheckItem::warning(
                    "Número WhatsApp",
                    "sem prefixo internacional (+)",
                ));
            }
        }

        let ok = twilio.is_configured();
        IntegrationCheck { name: "twilio", ok, items }
    }

    /// Deploy tokens are optional; this check never fails the report.
    pub fn check_cicd(&self) -> IntegrationCheck {
        let mut items = Vec::new();

        for var in ["VERCEL_TOKEN", "RAILWAY_TOKEN", "GITHUB_TOKEN"] {
            match std::env::var(var) {
                Ok(value) if !value.is_empty() => {
                    items.push(CheckItem::ok(var, format!("configurada ({})", mask(&value, 10))));
                }
                _ => {
                    items.push(CheckItem::warning(var, "não configurada (opcional)"));
                }
            }
        }

        match std::fs::read_to_string(".gitignore") {
            Ok(content) if content.contains(".env") => {
                items.push(CheckItem::ok(".gitignore", ".env está ignorado"));
            }
            Ok(_) => {
                items.push(CheckItem::warning(".gitignore", ".env pode estar exposto no Git"));
            }
            Err(_) => {
                items.push(CheckItem::warning(".gitignore", "não encontrado"));
            }
        }

        IntegrationCheck { name: "cicd", ok: true, items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(f: impl FnOnce(&mut GuiasMeiConfig)) -> GuiasMeiConfig {
        let mut config = GuiasMeiConfig::default();
        f(&mut config);
        config
    }

    #[test]
    fn test_mask_keeps_prefix_only() {
        assert_eq!(mask("sk_test_abcdefghij1234", 10), "sk_test_ab***");
        assert_eq!(mask("abc", 10), "abc***");
        assert_eq!(mask("", 10), "***");
    }

    #[tokio::test]
    async fn test_supabase_missing_credentials_skips_probes() {
        let config = GuiasMeiConfig::default();
        let checker = CredentialChecker::new(&config);

        let check = checker.check_supabase().await;
        assert!(!check.ok);
        assert_eq!(check.items.len(), 3);
        assert!(check.items.iter().all(|i| i.outcome == CheckOutcome::Error));
    }

    #[test]
    fn test_stripe_detects_test_mode() {
        let config = config_with(|c| {
            c.stripe.secret_key = "sk_test_abcdef".into();
            c.stripe.webhook_secret = "whsec_123456".into();
        });
        let check = CredentialChecker::new(&config).check_stripe();
        assert!(check.ok);
        assert!(check.items.iter().any(|i| i.label == "Modo" && i.detail == "TESTE"));
        // Secrets never appear unmasked.
        assert!(!check.items.iter().any(|i| i.detail.contains("sk_test_abcdef")));
    }

    #[test]
    fn test_stripe_warns_on_live_mode() {
        let config = config_with(|c| {
            c.stripe.secret_key = "sk_live_abcdef".into();
            c.stripe.webhook_secret = "whsec_123456".into();
        });
        let check = CredentialChecker::new(&config).check_stripe();
        assert!(check.ok);
        let modo = check.items.iter().find(|i| i.label == "Modo").unwrap();
        assert_eq!(modo.outcome, CheckOutcome::Warning);
    }

    #[test]
    fn test_twilio_requires_all_three_credentials() {
        let partial = config_with(|c| {
            c.twilio.account_sid = "AC123".into();
            c.twilio.auth_token = "token".into();
        });
        assert!(!CredentialChecker::new(&partial).check_twilio().ok);

        let full = config_with(|c| {
            c.twilio.account_sid = "AC123".into();
            c.twilio.auth_token = "token".into();
            c.twilio.whatsapp_from = "whatsapp:+14155238886".into();
        });
        assert!(CredentialChecker::new(&full).check_twilio().ok);
    }

    #[test]
    fn test_twilio_flags_odd_sid_prefix() {
        let config = config_with(|c| {
            c.twilio.account_sid = "XY123".into();
            c.twilio.auth_token = "token".into();
            c.twilio.whatsapp_from = "+14155238886".into();
        });
        let check = CredentialChecker::new(&config).check_twilio();
        assert!(check.items.iter().any(|i| i.label == "Formato do SID"));
    }

    #[test]
    fn test_nfse_passes_with_any_endpoint() {
        let none = GuiasMeiConfig::default();
        assert!(!CredentialChecker::new(&none).check_nfse().ok);

        let one = config_with(|c| {
            c.nfse.danfse_url = "https://adn.nfse.gov.br/danfse".into();
        });
        assert!(CredentialChecker::new(&one).check_nfse().ok);
    }

    #[test]
    fn test_cicd_is_always_advisory() {
        let config = GuiasMeiConfig::default();
        let check = CredentialChecker::new(&config).check_cicd();
        assert!(check.ok);
        assert!(check.items.len() >= 4);
    }
}
