//! WhatsApp message templates for billing notifications.
//!
//! Rendering is pure: the same (kind, charge, payload) always produces
//! byte-identical text. Dates shown in messages come from the payload or
//! the charge row, never from the clock.

use chrono::{DateTime, Utc};
use serde_json::Value;

use guiasmei_core::error::{GuiasMeiError, Result};
use guiasmei_core::types::{Charge, NotificationKind};

const FOOTER: &str = "_GuiasMEI - Gestão Fiscal Simplificada_";

/// Render the message for a notification kind.
///
/// Unknown kinds fall through to a generic charge-status message, so a
/// new event tag in the queue degrades to a bland text instead of a
/// failed record. `Err(MissingAmount)` is the only failure and retry
/// never heals it.
pub fn render(kind: &NotificationKind, charge: &Charge, payload: &Value) -> Result<String> {
    match kind {
        NotificationKind::PaymentReceived => payment_received(charge, payload),
        NotificationKind::PaymentReturned => Ok(payment_returned(charge, payload)),
        NotificationKind::InvoicePaid => invoice_paid(charge, payload),
        NotificationKind::InvoiceOverdue => invoice_overdue(charge),
        NotificationKind::ChargePaid => charge_paid(charge, payload),
        NotificationKind::ChargeCancelled => Ok(charge_cancelled(charge, payload)),
        NotificationKind::Unknown(_) => Ok(generic(charge)),
    }
}

/// Paid-amount precedence: explicit payload value, then the settled
/// amount on the charge, then the original amount.
fn resolve_amount(charge: &Charge, payload: &Value) -> Option<f64> {
    payload
        .get("valor")
        .and_then(|v| v.as_f64())
        .or(charge.valor_pago)
        .or(charge.valor_original)
}

fn format_amount(valor: Option<f64>) -> Result<String> {
    valor
        .map(|v| format!("R$ {v:.2}"))
        .ok_or(GuiasMeiError::MissingAmount)
}

/// Timestamp shown in the message: explicit payload field first, then
/// the charge row timestamps.
fn resolve_timestamp(charge: &Charge, payload: &Value) -> Option<DateTime<Utc>> {
    for key in ["data", "horario", "data_pagamento"] {
        if let Some(raw) = payload.get(key).and_then(|v| v.as_str())
            && let Ok(parsed) = raw.parse::<DateTime<Utc>>()
        {
            return Some(parsed);
        }
    }
    charge.atualizado_em.or(charge.criado_em)
}

fn format_datetime(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%d/%m/%Y às %H:%M").to_string())
        .unwrap_or_else(|| "-".into())
}

fn format_date(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".into())
}

fn payment_received(charge: &Charge, payload: &Value) -> Result<String> {
    let valor = format_amount(resolve_amount(charge, payload))?;
    let data = format_datetime(resolve_timestamp(charge, payload));
    Ok(format!(
        "✅ *Pagamento Recebido via PIX*\n\n\
         Olá! Confirmamos o recebimento do seu pagamento.\n\n\
         📋 *Identificador:* {id}\n\
         💰 *Valor:* {valor}\n\
         📅 *Data:* {data}\n\n\
         Obrigado por utilizar nossos serviços! 🙏\n\n\
         {FOOTER}",
        id = charge.identificador,
    ))
}

fn payment_returned(charge: &Charge, payload: &Value) -> String {
    let motivo = payload
        .get("motivo_devolucao")
        .and_then(|v| v.as_str())
        .unwrap_or("Não informado");
    let data = format_datetime(resolve_timestamp(charge, payload));
    format!(
        "⚠️ *Pagamento Devolvido*\n\n\
         Informamos que seu pagamento foi devolvido.\n\n\
         📋 *Identificador:* {id}\n\
         ❓ *Motivo:* {motivo}\n\
         📅 *Data:* {data}\n\n\
         Se precisar de ajuda, entre em contato conosco.\n\n\
         {FOOTER}",
        id = charge.identificador,
    )
}

fn invoice_paid(charge: &Charge, payload: &Value) -> Result<String> {
    let valor = format_amount(resolve_amount(charge, payload))?;
    let data = format_date(resolve_timestamp(charge, payload));
    Ok(format!(
        "✅ *Boleto Pago com Sucesso*\n\n\
         Confirmamos o pagamento do seu boleto.\n\n\
         📋 *Nosso Número:* {id}\n\
         💰 *Valor:* {valor}\n\
         📅 *Data do Pagamento:* {data}\n\n\
         Obrigado pela preferência! 🙏\n\n\
         {FOOTER}",
        id = charge.identificador,
    ))
}

/// Overdue boletos always show the amount due, not any partial payment.
fn invoice_overdue(charge: &Charge) -> Result<String> {
    let valor = format_amount(charge.valor_original)?;
    let vencimento = charge
        .data_vencimento
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".into());
    Ok(format!(
        "⏰ *Boleto Vencido - Ação Necessária*\n\n\
         Seu boleto venceu e precisa de atenção.\n\n\
         📋 *Nosso Número:* {id}\n\
         💰 *Valor:* {valor}\n\
         📅 *Vencimento:* {vencimento}\n\n\
         Para regularizar, solicite um novo boleto atualizado.\n\n\
         {FOOTER}",
        id = charge.identificador,
    ))
}

fn charge_paid(charge: &Charge, payload: &Value) -> Result<String> {
    let valor = format_amount(resolve_amount(charge, payload))?;
    let data = format_datetime(resolve_timestamp(charge, payload));
    Ok(format!(
        "✅ *Cobrança Quitada*\n\n\
         Sua cobrança foi paga com sucesso!\n\n\
         📋 *Identificador:* {id}\n\
         💰 *Valor:* {valor}\n\
         📅 *Data:* {data}\n\n\
         Muito obrigado! 🎉\n\n\
         {FOOTER}",
        id = charge.identificador,
    ))
}

fn charge_cancelled(charge: &Charge, payload: &Value) -> String {
    let motivo = payload
        .get("motivo")
        .and_then(|v| v.as_str())
        .unwrap_or("Solicitação do usuário");
    let data = format_datetime(resolve_timestamp(charge, payload));
    format!(
        "❌ *Cobrança Cancelada*\n\n\
         Sua cobrança foi cancelada.\n\n\
         📋 *Identificador:* {id}\n\
         ❓ *Motivo:* {motivo}\n\
         📅 *Data:* {data}\n\n\
         Se tiver dúvidas, estamos à disposição.\n\n\
         {FOOTER}",
        id = charge.identificador,
    )
}

fn generic(charge: &Charge) -> String {
    format!(
        "📬 *Atualização de Cobrança*\n\n\
         Tipo: {tipo}\n\
         Identificador: {id}\n\
         Status: {status}\n\n\
         {FOOTER}",
        tipo = charge.tipo,
        id = charge.identificador,
        status = charge.status,
    )
}
