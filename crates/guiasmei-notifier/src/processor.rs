//! Poll-process-retry worker over the pending notification queue.
//!
//! Each cycle fetches a batch of Pending records oldest-first and walks
//! them one by one: resolve the charge, render the template, dispatch via
//! WhatsApp, record the outcome. Per-record failures never abort the
//! batch; a failed fetch only stretches the pause before the next cycle.

use std::sync::Arc;
use std::time::Duration;

use guiasmei_core::config::NotifierConfig;
use guiasmei_core::error::{GuiasMeiError, Result};
use guiasmei_core::traits::{DeliveryChannel, NotificationStore};
use guiasmei_core::types::{NotificationRecord, NotificationStatus, SendOutcome};
use guiasmei_store::MAX_ATTEMPTS;

use crate::templates;

/// Counters for one pass over the pending queue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
}

enum RecordOutcome {
    Sent,
    Failed,
}

pub struct NotificationProcessor {
    store: Arc<dyn NotificationStore>,
    channel: Arc<dyn DeliveryChannel>,
    batch_size: u32,
    poll_interval: Duration,
    error_backoff: Duration,
}

impl NotificationProcessor {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        channel: Arc<dyn DeliveryChannel>,
        config: &NotifierConfig,
    ) -> Self {
        Self {
            store,
            channel,
            batch_size: config.batch_size,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            error_backoff: Duration::from_secs(config.error_backoff_secs),
        }
    }

    /// Drive the worker until the process exits. A failed fetch backs off
    /// longer than the regular poll pause; nothing escapes the loop.
    pub async fn run(&self) {
        tracing::info!(
            "📨 Notification worker started (poll every {}s, batch size {})",
            self.poll_interval.as_secs(),
            self.batch_size
        );

        loop {
            let pause = match self.run_cycle().await {
                Ok(stats) => {
                    if stats.processed > 0 {
                        tracing::info!(
                            "✅ Cycle finished: {} sent, {} failed of {} processed",
                            stats.sent,
                            stats.failed,
                            stats.processed
                        );
                    }
                    self.poll_interval
                }
                Err(e) => {
                    tracing::error!("❌ Could not fetch pending notifications: {e}");
                    self.error_backoff
                }
            };
            tokio::time::sleep(pause).await;
        }
    }

    /// One pass over the queue. Only the fetch itself can fail; every
    /// per-record error is absorbed into the stats.
    pub async fn run_cycle(&self) -> Result<CycleStats> {
        let records = self.store.fetch_pending(self.batch_size).await?;

        let mut stats = CycleStats::default();
        if records.is_empty() {
            return Ok(stats);
        }
        tracing::info!("📨 {} pending notification(s)", records.len());

        for record in &records {
            stats.processed += 1;
            match self.process_record(record).await {
                RecordOutcome::Sent => stats.sent += 1,
                RecordOutcome::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }

    async fn process_record(&self, record: &NotificationRecord) -> RecordOutcome {
        let Some(charge) = record.cobranca.as_ref() else {
            tracing::warn!("⚠️ Notification {} has no linked charge", record.id);
            return self.fail_terminal(record, "Cobrança não encontrada").await;
        };

        let recipient = match charge.pagador_whatsapp.as_deref() {
            Some(number) if !number.is_empty() => number,
            _ => {
                tracing::warn!("⚠️ Charge {} has no WhatsApp number", charge.identificador);
                return self.fail_terminal(record, "WhatsApp não informado").await;
            }
        };

        let message =
            match templates::render(&record.tipo_notificacao, charge, &record.dados_notificacao) {
                Ok(text) => text,
                Err(e @ GuiasMeiError::MissingAmount) => {
                    tracing::warn!("⚠️ Notification {} has no amount in any source", record.id);
                    return self.fail_terminal(record, &e.to_string()).await;
                }
                Err(e) => {
                    tracing::error!("❌ Notification {} failed to render: {e}", record.id);
                    return self.fail(record, &e.to_string()).await;
                }
            };

        tracing::info!(
            "📨 Sending {} notification to {}",
            record.tipo_notificacao.as_tag(),
            recipient
        );

        let attempt = match charge.pdf_url.as_deref() {
            Some(url) if !url.is_empty() => self.channel.send_media(recipient, &message, url).await,
            _ => self.channel.send(recipient, &message).await,
        };

        match attempt {
            Ok(SendOutcome::Delivered { message_sid }) => {
                if let Err(e) = self.store.mark_sent(&record.id).await {
                    // The message reached the provider; a lost status
                    // write must not be recorded as a send failure.
                    tracing::error!(
                        "❌ Notification {} delivered (sid {message_sid}) but status write failed: {e}",
                        record.id
                    );
                } else {
                    tracing::info!("✅ Notification {} sent (sid {})", record.id, message_sid);
                }
                RecordOutcome::Sent
            }
            Ok(SendOutcome::NotConfigured) => {
                tracing::warn!(
                    "⚠️ {} channel not configured, notification {} counted as failed",
                    self.channel.name(),
                    record.id
                );
                self.fail(record, "Canal WhatsApp não configurado").await
            }
            Ok(SendOutcome::ProviderError { reason }) => {
                tracing::warn!("⚠️ Provider rejected notification {}: {}", record.id, reason);
                self.fail(record, &reason).await
            }
            Err(e) => {
                tracing::error!("❌ Dispatch failed for notification {}: {e}", record.id);
                self.fail(record, "Falha no envio via Twilio").await
            }
        }
    }

    /// Record a retryable failure and log which side of the attempt
    /// budget the record landed on.
    async fn fail(&self, record: &NotificationRecord, reason: &str) -> RecordOutcome {
        match self.store.mark_failed(&record.id, reason).await {
            Ok(transition) if transition.status == NotificationStatus::Pending => {
                tracing::info!(
                    "⏰ Notification {} scheduled for retry ({}/{})",
                    record.id,
                    transition.attempts,
                    MAX_ATTEMPTS
                );
            }
            Ok(transition) => {
                tracing::warn!(
                    "❌ Notification {} failed permanently after {} attempt(s): {}",
                    record.id,
                    transition.attempts,
                    reason
                );
            }
            Err(e) => {
                tracing::error!(
                    "❌ Could not record failure for notification {}: {e}",
                    record.id
                );
            }
        }
        RecordOutcome::Failed
    }

    async fn fail_terminal(&self, record: &NotificationRecord, reason: &str) -> RecordOutcome {
        if let Err(e) = self.store.mark_failed_terminal(&record.id, reason).await {
            tracing::error!(
                "❌ Could not record terminal failure for notification {}: {e}",
                record.id
            );
        }
        RecordOutcome::Failed
    }
}
