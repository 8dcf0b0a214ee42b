use super::Notifier;
use crate::{Error, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Plaintext email over SMTP with STARTTLS
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipient: Mailbox,
}

impl SmtpNotifier {
    pub fn new(
        host: &str,
        port: u16,
        sender_email: &str,
        sender_password: &str,
        recipient_email: &str,
    ) -> Result<Self> {
        let credentials =
            SmtpCredentials::new(sender_email.to_string(), sender_password.to_string());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| Error::Notify(e.to_string()))?
            .port(port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            sender: parse_mailbox(sender_email)?,
            recipient: parse_mailbox(recipient_email)?,
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| Error::Notify(format!("invalid address {}: {}", address, e)))
}

/// Build the plaintext message
fn build_message(sender: &Mailbox, recipient: &Mailbox, subject: &str, body: &str) -> Result<Message> {
    Message::builder()
        .from(sender.clone())
        .to(recipient.clone())
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| Error::Notify(e.to_string()))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        tracing::info!(recipient = %self.recipient, "Sending message...");

        let message = build_message(&self.sender, &self.recipient, subject, body)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| Error::Notify(e.to_string()))?;

        tracing::info!("Message sent");
        Ok(())
    }
}
