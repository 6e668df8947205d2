use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use super::{MailError, Mailer, OutgoingEmail};
use crate::config::SmtpConfig;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

const SUBMISSION_PORT: u16 = 587;

fn uses_starttls(port: u16) -> bool {
    port == SUBMISSION_PORT
}

fn parse_address(raw: &str) -> Result<Address, MailError> {
    raw.parse::<Address>().map_err(|e| MailError::InvalidAddress {
        address: raw.to_string(),
        reason: e.to_string(),
    })
}

impl SmtpMailer {
    /// Authenticated relay. Port 587 upgrades with STARTTLS, any other port
    /// (usually 465) opens with implicit TLS.
    pub fn new(cfg: &SmtpConfig) -> Result<Self, MailError> {
        let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());
        let builder = if uses_starttls(cfg.port) {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
        };
        let transport = builder
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(cfg.port)
            .credentials(creds)
            .build();
        Self::with_transport(transport, &cfg.from_name, &cfg.from_email)
    }

    /// Plain connection without TLS or auth (Mailpit, MailHog).
    pub fn new_local(host: &str, port: u16, from_name: &str, from_email: &str) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();
        Self::with_transport(transport, from_name, from_email)
    }

    fn with_transport(
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from_name: &str,
        from_email: &str,
    ) -> Result<Self, MailError> {
        let from = Mailbox::new(Some(from_name.to_string()), parse_address(from_email)?);
        Ok(Self { transport, from })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, MailError> {
        let to = Mailbox::new(None, parse_address(&email.to)?);
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = self.build_message(&email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        debug!(subject = %email.subject, "email handed to smtp relay");
        Ok(())
    }
}
