use anyhow::{anyhow, Result};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;

use crate::config::SmtpConfig;

/// A plain-text message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

#[axum::async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        }
        .map_err(|err| anyhow!("failed to configure SMTP transport: {}", err))?
        .port(config.port);

        let builder = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            inner: builder.build(),
        })
    }
}

#[axum::async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let from = mail
            .from
            .parse::<Mailbox>()
            .map_err(|err| anyhow!("invalid sender address {}: {}", mail.from, err))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &mail.to {
            let mailbox = recipient
                .parse::<Mailbox>()
                .map_err(|err| anyhow!("invalid recipient address {}: {}", recipient, err))?;
            builder = builder.to(mailbox);
        }
        let message = builder.body(mail.body.clone())?;

        self.inner.send(message).await?;
        Ok(())
    }
}

/// No-op transport for environments without an SMTP relay.
pub struct LogTransport;

#[axum::async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        tracing::info!(
            from = %mail.from,
            to = ?mail.to,
            subject = %mail.subject,
            "mail transport disabled; message not delivered"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct Mailer {
    transport: Arc<dyn MailTransport>,
}

impl Mailer {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        if config.host.trim().is_empty() {
            tracing::warn!("SMTP host not configured; outgoing mail will only be logged");
            return Ok(Self::new(Arc::new(LogTransport)));
        }
        Ok(Self::new(Arc::new(SmtpTransport::new(config)?)))
    }

    pub async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        self.transport.send(mail).await
    }
}
