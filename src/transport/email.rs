use async_trait::async_trait;
use lettre::message::{header::ContentType, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{DeliveryTransport, OutboundMessage, TransportError};
use crate::config::SmtpConfig;
use crate::models::delivery_job::KIND_EMAIL;

/// SMTP transport built once at startup and reused across batches.
pub struct EmailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl EmailTransport {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl DeliveryTransport for EmailTransport {
    fn id(&self) -> &str {
        KIND_EMAIL
    }

    async fn send(
        &self,
        destination: &str,
        message: &OutboundMessage,
    ) -> Result<(), TransportError> {
        let OutboundMessage::Email(rendered) = message else {
            return Err(TransportError::from("Email transport given a non-email message"));
        };

        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| TransportError::from(format!("Invalid from address: {e}")))?,
            )
            .to(destination
                .parse()
                .map_err(|e| TransportError::from(format!("Invalid to address: {e}")))?)
            .subject(rendered.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(rendered.body_text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(rendered.body_html.clone()),
                    ),
            )
            .map_err(|e| TransportError::from(format!("Failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| TransportError::from(format!("Failed to send email: {e}")))?;

        Ok(())
    }
}
