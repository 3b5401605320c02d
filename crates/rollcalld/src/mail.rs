//! Welcome mail over SMTP.

use crate::config::{SmtpConfig, SmtpTls};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rollcall_notify::{ChannelError, Notification, NotificationChannel};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("smtp: {0}")]
    Transport(String),
}

impl MailError {
    /// True when the request itself was at fault rather than the transport.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidAddress { .. })
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, email: &str, name: &str) -> Result<(), MailError>;
}

/// HTML body of the welcome mail. `name` is escaped.
pub fn welcome_body(name: &str) -> String {
    format!(
        "<p>hey {}, your attendance was successfully noted</p>",
        escape_html(name)
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Build the welcome message for one recipient.
pub fn build_welcome(from: &Mailbox, to: &str, subject: &str, name: &str) -> Result<Message, MailError> {
    let to = parse_mailbox(to)?;
    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(welcome_body(name))
        .map_err(|e| MailError::Build(e.to_string()))
}

/// SMTP mailer built from [`SmtpConfig`].
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    subject: String,
    host: String,
}

impl SmtpMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, MailError> {
        let from = parse_mailbox(&config.from)?;

        let builder = match config.tls {
            SmtpTls::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };
        let mut builder = builder.port(config.port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            subject: config.subject.clone(),
            host: config.host.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Probe the relay. Used at startup for a readiness log line only.
    pub async fn verify(&self) -> Result<bool, MailError> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_welcome(&self, email: &str, name: &str) -> Result<(), MailError> {
        let message = build_welcome(&self.from, email, &self.subject, name)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        tracing::info!(email, host = %self.host, "welcome mail sent");
        Ok(())
    }
}

/// Delivers notifications straight through a [`Mailer`], bypassing HTTP.
pub struct MailerChannel {
    mailer: Arc<dyn Mailer>,
}

impl MailerChannel {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl NotificationChannel for MailerChannel {
    async fn send(&self, notification: &Notification) -> Result<String, ChannelError> {
        self.mailer
            .send_welcome(&notification.email, &notification.name)
            .await
            .map(|()| format!("Welcome email sent to {}", notification.email))
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }
}
