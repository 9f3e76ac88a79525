use irhabi_core::common::random_str;
use irhabi_core::{AppError, env};
use secrecy::{Secret, SecretString};

/// HTTP application settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Detailed error messages in responses and the startup route table.
    pub debug: bool,
    pub jwt_secret: SecretString,
    pub gzip: bool,
    pub host: String,
}

impl AppConfig {
    /// Read configuration from environment variables.
    ///
    /// - `APP_DEBUGMODE` (default true)
    /// - `APP_JWT_SECRET` (required outside debug mode; a random secret is
    ///   generated per process in debug mode)
    /// - `APP_GZIP` (default false)
    /// - `SERVER_HOST` (default `0.0.0.0:8500`)
    pub fn from_env() -> Result<Self, AppError> {
        let debug = env::get_bool("APP_DEBUGMODE", true);

        let jwt_secret = match env::get_optional("APP_JWT_SECRET") {
            Some(secret) => secret,
            None if debug => {
                tracing::warn!("APP_JWT_SECRET not set, using a random secret for this process");
                random_str(48)
            }
            None => {
                return Err(AppError::Config(
                    "APP_JWT_SECRET must be set when APP_DEBUGMODE is false".into(),
                ));
            }
        };

        Ok(Self {
            debug,
            jwt_secret: Secret::new(jwt_secret),
            gzip: env::get_bool("APP_GZIP", false),
            host: env::get_string("SERVER_HOST", "0.0.0.0:8500"),
        })
    }

    /// Debug-mode settings with a fixed secret, for tests and tools.
    pub fn with_secret(secret: &str) -> Self {
        Self {
            debug: true,
            jwt_secret: Secret::new(secret.to_string()),
            gzip: false,
            host: "127.0.0.1:0".to_string(),
        }
    }
}
