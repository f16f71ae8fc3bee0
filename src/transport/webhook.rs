use async_trait::async_trait;

use super::{DeliveryTransport, OutboundMessage, TransportError};
use crate::models::delivery_job::KIND_WEBHOOK;

pub struct WebhookTransport {
    client: reqwest::Client,
}

impl WebhookTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build reqwest client"),
        }
    }
}

impl Default for WebhookTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryTransport for WebhookTransport {
    fn id(&self) -> &str {
        KIND_WEBHOOK
    }

    async fn send(
        &self,
        destination: &str,
        message: &OutboundMessage,
    ) -> Result<(), TransportError> {
        let OutboundMessage::Webhook(payload) = message else {
            return Err(TransportError::from("Webhook transport given a non-webhook message"));
        };

        let resp = self
            .client
            .post(destination)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError::from(format!("Webhook request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(1024)
                .collect::<String>();
            return Err(TransportError::from(format!(
                "Webhook returned {status}: {body}"
            )));
        }

        Ok(())
    }
}
