//! Error taxonomy for the GuiasMEI backend.

use thiserror::Error;

/// All errors produced by GuiasMEI crates.
#[derive(Error, Debug)]
pub enum GuiasMeiError {
    /// Missing or malformed configuration. Fatal only to the affected integration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Supabase/PostgREST request failed (transport or API error).
    #[error("Store error: {0}")]
    Store(String),

    /// Messaging provider request failed at the transport level.
    #[error("Channel error: {0}")]
    Channel(String),

    /// Webhook signature or timestamp rejected.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// LLM endpoint returned an error or an unusable response.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Generic HTTP failure outside the store/channel clients.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Notification template requires an amount but none was found in the
    /// payload, the charge's paid amount, or the charge's original amount.
    #[error("Valor ausente para o template de notificação")]
    MissingAmount,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GuiasMeiError>;
