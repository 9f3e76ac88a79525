use std::future::Future;

use chrono::{DateTime, Utc};
use irhabi_core::common::password_hash;
use irhabi_core::{AppError, Rules, Validate};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

use crate::database::{Page, fetch_page};
use crate::query_log::logged;
use crate::request_query::RequestQuery;

pub const TABLE: &str = "users";

const COLUMNS: &str = "id, name, email, password, is_active, created_at";

/// A stored account. The password hash never leaves the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Registration payload. `password` is plain text until stored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Validate for NewUser {
    fn rules(&self, v: &mut Rules<'_>) {
        v.field("name", &self.name, "required|alpha_space|lte:100")
            .field("email", &self.email, "required|email")
            .field("password", &self.password, "required|gte:6");
    }
}

/// Account persistence.
pub trait UserStore: Send + Sync + Clone {
    /// Store a new account, hashing its password. Fails with `DataExists`
    /// on a duplicate email.
    fn create(&self, user: &NewUser) -> impl Future<Output = Result<User, AppError>> + Send;

    fn find_by_id(&self, id: u64) -> impl Future<Output = Result<Option<User>, AppError>> + Send;

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, AppError>> + Send;

    /// One page of accounts shaped by a request query.
    fn list(&self, rq: &RequestQuery)
    -> impl Future<Output = Result<Page<User>, AppError>> + Send;
}

/// MySQL-backed [`UserStore`].
#[derive(Clone)]
pub struct UserRepository {
    pool: MySqlPool,
}

impl UserRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: &NewUser) -> Result<User, AppError> {
        let hashed = password_hash(&user.password)?;
        let sql = "INSERT INTO users (name, email, password) VALUES (?, ?, ?)";

        let done = logged(
            "insert",
            sql,
            sqlx::query(sql)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&hashed)
                .execute(&self.pool),
        )
        .await
        .map_err(|e| match e {
            AppError::DataExists { .. } => {
                AppError::exists("email", "The email has already been taken.")
            }
            other => other,
        })?;

        self.find_by_id(done.last_insert_id())
            .await?
            .ok_or_else(|| AppError::not_exists("id", "The record is not exists."))
    }

    pub async fn find_by_id(&self, id: u64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = ?");
        let row = logged(
            "select",
            &sql,
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE email = ?");
        let row = logged(
            "select",
            &sql,
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(email)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn list(&self, rq: &RequestQuery) -> Result<Page<User>, AppError> {
        let page = fetch_page::<UserRow>(&self.pool, TABLE, rq).await?;
        Ok(Page {
            items: page.items.into_iter().map(Into::into).collect(),
            total: page.total,
        })
    }
}

// -- Internal row type for sqlx deserialization --

// Missing columns default so that `fields=` projections still decode.
#[derive(sqlx::FromRow, Default)]
#[sqlx(default)]
struct UserRow {
    id: u64,
    name: String,
    email: String,
    password: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            password: row.password,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

// -- Trait implementation --

impl UserStore for UserRepository {
    async fn create(&self, user: &NewUser) -> Result<User, AppError> {
        UserRepository::create(self, user).await
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<User>, AppError> {
        UserRepository::find_by_id(self, id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        UserRepository::find_by_email(self, email).await
    }

    async fn list(&self, rq: &RequestQuery) -> Result<Page<User>, AppError> {
        UserRepository::list(self, rq).await
    }
}
