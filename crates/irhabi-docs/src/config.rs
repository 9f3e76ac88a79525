use irhabi_core::AppError;
use irhabi_core::env;
use mongodb::bson::doc;
use mongodb::{Client, Database};

/// Connection settings for one MongoDB collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

impl MongoConfig {
    /// Settings for the document version store.
    ///
    /// `MGO_HOST` (default `127.0.0.1:27017`), `MGO_DB` (default `version`),
    /// `MGO_DOCV_COLLECTION` (default `document_version`).
    pub fn versioning_from_env() -> Self {
        Self::from_env("version", "MGO_DOCV_COLLECTION", "document_version")
    }

    /// Settings for the notification store.
    ///
    /// `MGO_HOST`, `MGO_DB` (default `notify`), `MGO_NOTIFY_COLLECTION`
    /// (default `notify_document`).
    pub fn notify_from_env() -> Self {
        Self::from_env("notify", "MGO_NOTIFY_COLLECTION", "notify_document")
    }

    fn from_env(default_db: &str, collection_var: &str, default_collection: &str) -> Self {
        Self {
            uri: normalize_uri(&env::get_string("MGO_HOST", "127.0.0.1:27017")),
            database: env::get_string("MGO_DB", default_db),
            collection: env::get_string(collection_var, default_collection),
        }
    }

    /// Connect and ping the server.
    pub async fn connect(&self) -> Result<Database, AppError> {
        let client = Client::with_uri_str(&self.uri)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to MongoDB: {e}")))?;
        let db = client.database(&self.database);

        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AppError::Database(format!("MongoDB ping failed: {e}")))?;

        tracing::info!(
            database = %self.database,
            collection = %self.collection,
            "Connected to MongoDB"
        );
        Ok(db)
    }
}

/// Accept bare `host:port` as well as full `mongodb://` URIs.
fn normalize_uri(host: &str) -> String {
    if host.starts_with("mongodb://") || host.starts_with("mongodb+srv://") {
        host.to_string()
    } else {
        format!("mongodb://{host}")
    }
}
