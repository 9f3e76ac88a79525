use std::future::Future;

use irhabi_core::AppError;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use secrecy::ExposeSecret;

use crate::config::MailerConfig;
use crate::message::{Message, format_date};

/// Delivers built messages.
pub trait MailTransport: Send + Sync + Clone {
    fn deliver(
        &self,
        message: lettre::Message,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// SMTP delivery over STARTTLS, or implicit TLS when `ssl` is set.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailerConfig) -> Result<Self, AppError> {
        let builder = if config.ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| AppError::Mail(format!("Invalid SMTP host '{}': {e}", config.host)))?;

        let mut builder = builder.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

impl MailTransport for SmtpMailer {
    async fn deliver(&self, message: lettre::Message) -> Result<(), AppError> {
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Mail(e.to_string()))
    }
}

/// Sends [`Message`]s from a fixed sender.
#[derive(Clone)]
pub struct Mailer<T: MailTransport> {
    transport: T,
    sender: String,
}

impl Mailer<SmtpMailer> {
    /// SMTP mailer from configuration.
    pub fn smtp(config: &MailerConfig) -> Result<Self, AppError> {
        Ok(Self::new(SmtpMailer::new(config)?, config.sender()))
    }
}

impl<T: MailTransport> Mailer<T> {
    pub fn new(transport: T, sender: impl Into<String>) -> Self {
        Self {
            transport,
            sender: sender.into(),
        }
    }

    /// A new message with `From` set to the configured sender.
    pub fn message(&self) -> Message {
        let mut message = Message::new();
        message.from(self.sender.clone());
        message
    }

    /// Build and deliver. Failures are logged and returned.
    pub async fn send(&self, message: &Message) -> Result<(), AppError> {
        let result = match message.build() {
            Ok(built) => self.transport.deliver(built).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => tracing::info!(
                to = ?message.recipients(),
                subject = %message.subject_line(),
                date = %format_date(&chrono::Utc::now()),
                "Mail sent"
            ),
            Err(e) => tracing::error!(
                to = ?message.recipients(),
                subject = %message.subject_line(),
                error = %e,
                "Mail delivery failed"
            ),
        }
        result
    }
}
