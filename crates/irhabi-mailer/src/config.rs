use std::path::PathBuf;

use irhabi_core::env;
use secrecy::{Secret, SecretString};

/// SMTP credentials and sender identity.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub host: String,
    pub port: u16,
    /// Implicit TLS instead of STARTTLS.
    pub ssl: bool,
    pub username: String,
    pub password: SecretString,
    pub sender_email: String,
    pub sender_name: String,
    pub template_dir: Option<PathBuf>,
}

impl MailerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `SMTP_HOST` (default `localhost`), `SMTP_PORT` (default 587),
    ///   `SMTP_SSL` (default false)
    /// - `SMTP_USERNAME`, `SMTP_PASSWORD` (no authentication when the
    ///   username is empty)
    /// - `SMTP_SENDER` (default `noreply@localhost`), `SMTP_SENDER_NAME`
    /// - `EMAIL_TEMPLATE_DIR` (optional)
    pub fn from_env() -> Self {
        let port = u16::try_from(env::get_int("SMTP_PORT", 587)).unwrap_or(587);

        Self {
            host: env::get_string("SMTP_HOST", "localhost"),
            port,
            ssl: env::get_bool("SMTP_SSL", false),
            username: env::get_string("SMTP_USERNAME", ""),
            password: Secret::new(env::get_string("SMTP_PASSWORD", "")),
            sender_email: env::get_string("SMTP_SENDER", "noreply@localhost"),
            sender_name: env::get_string("SMTP_SENDER_NAME", ""),
            template_dir: env::get_optional("EMAIL_TEMPLATE_DIR").map(PathBuf::from),
        }
    }

    /// The `From` mailbox built from the sender fields.
    pub fn sender(&self) -> String {
        crate::message::format_address(&self.sender_email, &self.sender_name)
    }
}
