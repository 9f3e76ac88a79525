use thiserror::Error;

use crate::validation::Output;

/// Application-wide error types for irhabi.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request payload failed one or more validation rules.
    #[error("{0}")]
    Validation(Output),

    /// A referenced record could not be found.
    #[error("{field}: {message}")]
    DataNotExists { field: String, message: String },

    /// A record that must be unique already exists.
    #[error("{field}: {message}")]
    DataExists { field: String, message: String },

    /// An error that carries its own HTTP status code.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Missing or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Building or delivering an email failed.
    #[error("Mail error: {0}")]
    Mail(String),

    /// Push notification delivery failed.
    #[error("Push error: {0}")]
    Push(String),

    /// Template loading or rendering failed.
    #[error("Template error: {0}")]
    Template(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Shorthand for an [`AppError::Http`] with the given status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        AppError::Http {
            status,
            message: message.into(),
        }
    }

    /// Shorthand for [`AppError::DataNotExists`].
    pub fn not_exists(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::DataNotExists {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for [`AppError::DataExists`].
    pub fn exists(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::DataExists {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        match self {
            AppError::Validation(_)
            | AppError::DataNotExists { .. }
            | AppError::DataExists { .. }
            | AppError::Unauthorized(_)
            | AppError::Serialization(_) => true,
            AppError::Http { status, .. } => (400..500).contains(status),
            _ => false,
        }
    }
}

impl From<Output> for AppError {
    fn from(output: Output) -> Self {
        AppError::Validation(output)
    }
}
