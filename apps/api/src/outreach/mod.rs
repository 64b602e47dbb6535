//! Outreach dispatch: delivering a composed pitch to its candidate.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub mod handlers;

/// Errors a transport can surface. The console transport never fails; real
/// integrations construct these.
#[allow(dead_code)]
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// One message ready to leave the system.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub to_name: String,
    pub to_email: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// The delivery boundary. Carried in application state as a trait object so
/// tests inject a recording fake and a real email integration can slot in
/// without touching the dispatch handler.
#[async_trait]
pub trait OutreachTransport: Send + Sync {
    /// Delivers one message, returning a transport receipt.
    async fn deliver(&self, message: &OutboundMessage) -> Result<String, TransportError>;
}

/// Logs the message instead of sending it. The default transport until a
/// real email integration is configured.
pub struct ConsoleTransport;

#[async_trait]
impl OutreachTransport for ConsoleTransport {
    async fn deliver(&self, message: &OutboundMessage) -> Result<String, TransportError> {
        info!(
            "Outreach to {} <{}> from {}: {}",
            message.to_name, message.to_email, message.from, message.subject
        );
        info!("{}", message.body);
        Ok("delivered to console".to_string())
    }
}
