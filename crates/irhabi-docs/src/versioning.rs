//! Append-only document history.
//!
//! Every [`VersionStore::create`] call stores a full snapshot of a record
//! under `(doc_type, id)` with the next version number. Data and author are
//! kept as JSON text so a snapshot reads back exactly as it was written.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use irhabi_core::AppError;
use mongodb::bson::{self, doc};
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bson_time::{from_bson, mongo_error, to_bson};
use crate::config::MongoConfig;

/// One stored version of a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    #[serde(skip)]
    pub doc_type: String,
    #[serde(skip)]
    pub id: i64,
    pub version: i64,
    pub stored_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub updated_by: Value,
}

/// Persistence for document versions.
pub trait VersionStore: Send + Sync + Clone {
    /// Store a snapshot as the next version; the first version is 1.
    fn create(
        &self,
        doc_type: &str,
        id: i64,
        data: &Value,
        user: &Value,
    ) -> impl Future<Output = Result<Document, AppError>> + Send;

    /// A specific version, or the latest when `version` is `None` or 0.
    fn show(
        &self,
        doc_type: &str,
        id: i64,
        version: Option<i64>,
    ) -> impl Future<Output = Result<Document, AppError>> + Send;

    /// All versions, newest first.
    fn history(
        &self,
        doc_type: &str,
        id: i64,
    ) -> impl Future<Output = Result<Vec<Document>, AppError>> + Send;

    /// Delete every version, returning how many were removed.
    fn clean(&self, doc_type: &str, id: i64)
    -> impl Future<Output = Result<u64, AppError>> + Send;
}

// -- Stored form --

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredVersion {
    #[serde(rename = "type")]
    doc_type: String,
    id: i64,
    v: i64,
    data: String,
    updated_by: String,
    stored_at: bson::DateTime,
}

impl StoredVersion {
    fn new(doc_type: &str, id: i64, v: i64, data: &Value, user: &Value) -> Result<Self, AppError> {
        Ok(Self {
            doc_type: doc_type.to_string(),
            id,
            v,
            data: serde_json::to_string(data)?,
            updated_by: serde_json::to_string(user)?,
            stored_at: to_bson(Utc::now()),
        })
    }

    fn present(self) -> Document {
        Document {
            data: serde_json::from_str(&self.data).unwrap_or(Value::Null),
            updated_by: serde_json::from_str(&self.updated_by).unwrap_or(Value::Null),
            stored_at: from_bson(self.stored_at),
            version: self.v,
            id: self.id,
            doc_type: self.doc_type,
        }
    }
}

fn missing_version() -> AppError {
    AppError::not_exists("version", "The document version is not exists.")
}

// -- MongoDB --

/// [`VersionStore`] backed by a MongoDB collection.
#[derive(Clone)]
pub struct MongoVersionStore {
    collection: Collection<StoredVersion>,
}

impl MongoVersionStore {
    pub fn new(db: &Database, collection: &str) -> Self {
        Self {
            collection: db.collection(collection),
        }
    }

    pub async fn connect(config: &MongoConfig) -> Result<Self, AppError> {
        let db = config.connect().await?;
        Ok(Self::new(&db, &config.collection))
    }

    async fn find(
        &self,
        doc_type: &str,
        id: i64,
        version: Option<i64>,
    ) -> Result<Option<StoredVersion>, AppError> {
        let mut filter = doc! { "type": doc_type, "id": id };
        if let Some(v) = version.filter(|v| *v != 0) {
            filter.insert("v", v);
        }

        self.collection
            .find_one(filter)
            .sort(doc! { "v": -1 })
            .await
            .map_err(mongo_error)
    }
}

impl VersionStore for MongoVersionStore {
    async fn create(
        &self,
        doc_type: &str,
        id: i64,
        data: &Value,
        user: &Value,
    ) -> Result<Document, AppError> {
        let last = self.find(doc_type, id, None).await?.map_or(0, |d| d.v);
        let record = StoredVersion::new(doc_type, id, last + 1, data, user)?;

        self.collection
            .insert_one(&record)
            .await
            .map_err(mongo_error)?;

        tracing::debug!(doc_type, id, version = record.v, "Stored document version");
        Ok(record.present())
    }

    async fn show(
        &self,
        doc_type: &str,
        id: i64,
        version: Option<i64>,
    ) -> Result<Document, AppError> {
        self.find(doc_type, id, version)
            .await?
            .map(StoredVersion::present)
            .ok_or_else(missing_version)
    }

    async fn history(&self, doc_type: &str, id: i64) -> Result<Vec<Document>, AppError> {
        let cursor = self
            .collection
            .find(doc! { "type": doc_type, "id": id })
            .sort(doc! { "v": -1 })
            .await
            .map_err(mongo_error)?;

        let records: Vec<StoredVersion> = cursor.try_collect().await.map_err(mongo_error)?;
        Ok(records.into_iter().map(StoredVersion::present).collect())
    }

    async fn clean(&self, doc_type: &str, id: i64) -> Result<u64, AppError> {
        let result = self
            .collection
            .delete_many(doc! { "type": doc_type, "id": id })
            .await
            .map_err(mongo_error)?;
        Ok(result.deleted_count)
    }
}

// -- In-memory --

/// [`VersionStore`] held in process memory.
#[derive(Clone, Default)]
pub struct MemoryVersionStore {
    records: Arc<Mutex<Vec<StoredVersion>>>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, doc_type: &str, id: i64) -> Vec<StoredVersion> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let mut found: Vec<_> = records
            .iter()
            .filter(|r| r.doc_type == doc_type && r.id == id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.v.cmp(&a.v));
        found
    }
}

impl VersionStore for MemoryVersionStore {
    async fn create(
        &self,
        doc_type: &str,
        id: i64,
        data: &Value,
        user: &Value,
    ) -> Result<Document, AppError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let last = records
            .iter()
            .filter(|r| r.doc_type == doc_type && r.id == id)
            .map(|r| r.v)
            .max()
            .unwrap_or(0);

        let record = StoredVersion::new(doc_type, id, last + 1, data, user)?;
        records.push(record.clone());
        Ok(record.present())
    }

    async fn show(
        &self,
        doc_type: &str,
        id: i64,
        version: Option<i64>,
    ) -> Result<Document, AppError> {
        let wanted = version.filter(|v| *v != 0);
        self.matching(doc_type, id)
            .into_iter()
            .find(|r| wanted.is_none_or(|v| r.v == v))
            .map(StoredVersion::present)
            .ok_or_else(missing_version)
    }

    async fn history(&self, doc_type: &str, id: i64) -> Result<Vec<Document>, AppError> {
        Ok(self
            .matching(doc_type, id)
            .into_iter()
            .map(StoredVersion::present)
            .collect())
    }

    async fn clean(&self, doc_type: &str, id: i64) -> Result<u64, AppError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|r| !(r.doc_type == doc_type && r.id == id));
        Ok((before - records.len()) as u64)
    }
}
