use irhabi_core::AppError;
use secrecy::ExposeSecret;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{FromRow, MySqlPool};

use crate::config::DatabaseConfig;
use crate::query_log::logged;
use crate::request_query::RequestQuery;
use crate::users::UserRepository;

/// One page of rows plus the number of rows matching the filter.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Central database facade. Owns the connection pool, runs migrations,
/// and vends repository instances.
#[derive(Clone)]
pub struct Database {
    pool: MySqlPool,
}

impl Database {
    /// Connect to MySQL with the given configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(config.url.expose_secret())
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect: {e}")))?;

        tracing::info!(url = %config.redacted_url(), "Connected to database");
        Ok(Self { pool })
    }

    /// Create a `Database` from an existing pool (useful for testing).
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get a [`UserRepository`] backed by this pool.
    pub fn user_repo(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        logged("ping", "SELECT 1", sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }

    /// Fetch rows from `table` shaped by `rq`, along with the filtered total.
    pub async fn fetch_page<T>(&self, table: &str, rq: &RequestQuery) -> Result<Page<T>, AppError>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        fetch_page(&self.pool, table, rq).await
    }
}

/// Paged select against any pool; shared by the repositories.
pub(crate) async fn fetch_page<T>(
    pool: &MySqlPool,
    table: &str,
    rq: &RequestQuery,
) -> Result<Page<T>, AppError>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    let mut select = rq.select(table)?;
    let sql = select.sql().to_string();
    let items = logged("select", &sql, select.build_query_as::<T>().fetch_all(pool)).await?;

    let mut count = rq.count(table)?;
    let sql = count.sql().to_string();
    let total = logged("count", &sql, count.build_query_scalar::<i64>().fetch_one(pool)).await?;

    Ok(Page { items, total })
}
