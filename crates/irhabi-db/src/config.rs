use irhabi_core::AppError;
use irhabi_core::env;
use secrecy::{ExposeSecret, Secret, SecretString};
use url::Url;

/// Configuration for the MySQL connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Read configuration from environment variables.
    ///
    /// - `DATABASE_URL` (takes precedence when set)
    /// - otherwise `DB_HOST` (default `127.0.0.1:3306`), `DB_USER` (default
    ///   `root`), `DB_PASS`, `DB_NAME` (required)
    /// - `DATABASE_MAX_CONNECTIONS` (optional, defaults to 5)
    pub fn from_env() -> Result<Self, AppError> {
        let url = match env::get_optional("DATABASE_URL") {
            Some(url) => url,
            None => {
                let name = env::get_optional("DB_NAME").ok_or_else(|| {
                    AppError::Config(
                        "DATABASE_URL or DB_NAME must be set for database operations.".into(),
                    )
                })?;
                compose_url(
                    &env::get_string("DB_HOST", "127.0.0.1:3306"),
                    &env::get_string("DB_USER", "root"),
                    &env::get_string("DB_PASS", ""),
                    &name,
                )?
            }
        };

        let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
            Err(_) => 5,
            Ok(raw) => {
                let parsed: u32 = raw.parse().map_err(|_| {
                    AppError::Config(format!(
                        "Invalid DATABASE_MAX_CONNECTIONS '{raw}': must be a positive integer"
                    ))
                })?;
                if parsed == 0 {
                    return Err(AppError::Config(
                        "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
                    ));
                }
                parsed
            }
        };

        Ok(Self {
            url: Secret::new(url),
            max_connections,
        })
    }

    /// Connection URL with the password masked, for logs.
    pub fn redacted_url(&self) -> String {
        match Url::parse(self.url.expose_secret()) {
            Ok(mut u) => {
                if u.password().is_some() {
                    let _ = u.set_password(Some("***"));
                }
                u.to_string()
            }
            Err(_) => "<invalid url>".to_string(),
        }
    }
}

/// Build a `mysql://` URL, escaping credentials.
pub fn compose_url(host: &str, user: &str, pass: &str, name: &str) -> Result<String, AppError> {
    let mut url = Url::parse(&format!("mysql://{host}/"))
        .map_err(|e| AppError::Config(format!("Invalid DB_HOST '{host}': {e}")))?;
    url.set_path(name);
    url.set_username(user)
        .map_err(|_| AppError::Config("Invalid DB_USER".into()))?;
    if !pass.is_empty() {
        url.set_password(Some(pass))
            .map_err(|_| AppError::Config("Invalid DB_PASS".into()))?;
    }
    url.query_pairs_mut().append_pair("charset", "utf8mb4");
    Ok(url.to_string())
}
