pub mod email;
pub mod webhook;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::render::RenderedEmail;

/// The message handed to a transport, built by the worker from the job.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Email(RenderedEmail),
    Webhook(serde_json::Value),
}

#[derive(Debug)]
pub struct TransportError {
    pub message: String,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<String> for TransportError {
    fn from(s: String) -> Self {
        TransportError { message: s }
    }
}

impl From<&str> for TransportError {
    fn from(s: &str) -> Self {
        TransportError {
            message: s.to_string(),
        }
    }
}

/// External collaborator that attempts one network send. All errors are
/// treated as transient by the worker and count toward the retry budget.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Job kind this transport handles ("email", "webhook").
    fn id(&self) -> &str;

    async fn send(
        &self,
        destination: &str,
        message: &OutboundMessage,
    ) -> Result<(), TransportError>;
}

pub struct TransportRegistry {
    transports: HashMap<String, Arc<dyn DeliveryTransport>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self {
            transports: HashMap::new(),
        }
    }

    pub fn register(&mut self, transport: Arc<dyn DeliveryTransport>) {
        self.transports.insert(transport.id().to_string(), transport);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn DeliveryTransport>> {
        self.transports.get(id)
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::new()
    }
}
