//! Outbound message delivery trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SendOutcome;

/// A channel that delivers rendered notifications to a recipient.
///
/// `Err` means the attempt never reached the provider (transport fault,
/// broken TLS, DNS). A provider that answered with a rejection comes back
/// as `Ok(SendOutcome::ProviderError { .. })` so callers can tell the two
/// apart in logs.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the channel has credentials to actually dispatch. An
    /// unconfigured channel must return `SendOutcome::NotConfigured` from
    /// `send` without touching the network.
    fn is_configured(&self) -> bool;

    async fn send(&self, to: &str, body: &str) -> Result<SendOutcome>;

    /// Send a message with an attached media URL (charge PDF, DANFSE).
    async fn send_media(&self, to: &str, body: &str, media_url: &str) -> Result<SendOutcome>;
}
