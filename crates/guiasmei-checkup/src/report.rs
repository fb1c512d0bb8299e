//! Aggregated readiness report with console rendering.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::checks::IntegrationCheck;

/// Coverage summary over all integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Conformity {
    pub ok: usize,
    pub total: usize,
    pub percent: u32,
}

/// Snapshot of every integration check. Serialized as-is on the
/// gateway's `/health/integrations` route.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialReport {
    pub generated_at: DateTime<Utc>,
    pub integrations: Vec<IntegrationCheck>,
}

impl CredentialReport {
    pub fn new(integrations: Vec<IntegrationCheck>) -> Self {
        Self {
            generated_at: Utc::now(),
            integrations,
        }
    }

    pub fn conformity(&self) -> Conformity {
        let total = self.integrations.len();
        let ok = self.integrations.iter().filter(|i| i.ok).count();
        let percent = if total == 0 {
            0
        } else {
            ((ok as f64 / total as f64) * 100.0).round() as u32
        };
        Conformity { ok, total, percent }
    }

    /// Operator advice for every integration that failed its pass rule.
    pub fn recommendations(&self) -> Vec<String> {
        let mut advice = Vec::new();
        for check in &self.integrations {
            if check.ok {
                continue;
            }
            let text = match check.name {
                "supabase" => "Configure as credenciais do Supabase no arquivo .env",
                "nfse" => "Configure as URLs do ADN NFSe Nacional",
                "stripe" => "Configure as chaves do Stripe para pagamentos",
                "twilio" => "Configure o Twilio para envio de WhatsApp",
                other => {
                    advice.push(format!("Revise a configuração de {other}"));
                    continue;
                }
            };
            advice.push(text.to_string());
        }
        advice
    }

    fn display_name(name: &str) -> &str {
        match name {
            "supabase" => "Supabase",
            "nfse" => "NFSe Nacional",
            "stripe" => "Stripe",
            "twilio" => "Twilio WhatsApp",
            "cicd" => "CI/CD",
            other => other,
        }
    }

    /// Render the full console report.
    pub fn to_console(&self) -> String {
        let bar = "=".repeat(80);
        let mut out = String::new();

        out.push_str(&format!("{bar}\n"));
        out.push_str("VERIFICAÇÃO DE CREDENCIAIS - GuiasMEI\n");
        out.push_str(&format!("Gerado em: {}\n", self.generated_at.format("%d/%m/%Y %H:%M:%S UTC")));
        out.push_str(&format!("{bar}\n"));

        for check in &self.integrations {
            out.push_str(&format!("\n[{}]\n", Self::display_name(check.name)));
            for item in &check.items {
                out.push_str(&format!(
                    "  {} {}: {}\n",
                    item.outcome.symbol(),
                    item.label,
                    item.detail
                ));
            }
        }

        out.push_str(&format!("\n{bar}\n"));
        out.push_str("RESUMO\n");
        out.push_str(&format!("{bar}\n"));
        for check in &self.integrations {
            let verdict = if check.ok { "✓ OK" } else { "✗ PROBLEMAS" };
            out.push_str(&format!("  {:<16} {}\n", Self::display_name(check.name), verdict));
        }

        let conformity = self.conformity();
        out.push_str(&format!(
            "\nCobertura: {}/{} ({}%)\n",
            conformity.ok, conformity.total, conformity.percent
        ));

        let advice = self.recommendations();
        if !advice.is_empty() {
            out.push_str("\nRECOMENDAÇÕES:\n");
            for line in &advice {
                out.push_str(&format!("  • {line}\n"));
            }
        }

        out
    }

    pub fn print_console(&self) {
        print!("{}", self.to_console());
    }
}
