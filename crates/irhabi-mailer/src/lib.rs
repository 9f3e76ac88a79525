//! Email for irhabi services: a MIME message builder on top of `lettre`,
//! SMTP delivery, and `tera` HTML templates.

pub mod config;
pub mod message;
pub mod templates;
pub mod transport;

pub use config::MailerConfig;
pub use message::{Encoding, Message, format_address, format_date};
pub use templates::Templates;
pub use transport::{MailTransport, Mailer, SmtpMailer};
