//! User notifications: storage and push delivery.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use irhabi_core::{AppError, Rules, Validate, Validation};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Document as BsonDocument, doc};
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use crate::bson_time::{from_bson, mongo_error, to_bson};
use crate::config::MongoConfig;
use crate::push::Pusher;

/// The object a notification refers to, e.g. `{id: "42", action: "approve"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectAction {
    pub id: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: i64,
    pub device_id: String,
    pub title: String,
    pub message: String,
    pub action_url: String,
    pub readed: bool,
    pub created_at: DateTime<Utc>,
    pub readed_at: Option<DateTime<Utc>>,
    pub object_action: Option<ObjectAction>,
}

/// Payload for [`Notifier::create`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewNotification {
    pub user_id: i64,
    pub device_id: String,
    pub title: String,
    pub message: String,
    pub action_url: String,
    pub object_action: Option<ObjectAction>,
}

impl Validate for NewNotification {
    fn rules(&self, v: &mut Rules<'_>) {
        v.field("user_id", &self.user_id, "required|gt:0")
            .field("message", &self.message, "required")
            .field("action_url", &self.action_url, "required");
    }
}

impl Notification {
    /// A fresh unread notification with a new id.
    pub fn stamp(new: &NewNotification, at: DateTime<Utc>) -> Self {
        Notification {
            id: ObjectId::new().to_hex(),
            user_id: new.user_id,
            device_id: new.device_id.clone(),
            title: new.title.clone(),
            message: new.message.clone(),
            action_url: new.action_url.clone(),
            readed: false,
            created_at: at,
            readed_at: None,
            object_action: new.object_action.clone(),
        }
    }

    fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.readed {
            return false;
        }
        self.readed = true;
        self.readed_at = Some(at);
        true
    }
}

/// Persistence for notifications.
pub trait NotificationStore: Send + Sync + Clone {
    fn insert(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Notifications for a user, newest first.
    fn by_user(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<Notification>, AppError>> + Send;

    /// Notifications for a device, newest first.
    fn by_device(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<Vec<Notification>, AppError>> + Send;

    /// Mark every unread notification of a user as read; returns the count.
    fn read_all(&self, user_id: i64) -> impl Future<Output = Result<u64, AppError>> + Send;

    /// Mark one notification as read. `false` when no unread notification
    /// has that id.
    fn read_by_id(&self, id: &str) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Mark the user's unread notification about `object_id`/`action` as read.
    fn read_by_object_action(
        &self,
        user_id: i64,
        object_id: &str,
        action: &str,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Delete every notification of a user; returns the count.
    fn clean(&self, user_id: i64) -> impl Future<Output = Result<u64, AppError>> + Send;
}

// -- Stored form --

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNotification {
    #[serde(rename = "_id")]
    id: ObjectId,
    user_id: i64,
    device_id: String,
    title: String,
    message: String,
    action_url: String,
    readed: bool,
    created_at: bson::DateTime,
    readed_at: Option<bson::DateTime>,
    object_action: Option<ObjectAction>,
}

impl StoredNotification {
    fn from_notification(n: &Notification) -> Result<Self, AppError> {
        let id = ObjectId::parse_str(&n.id)
            .map_err(|_| AppError::not_exists("id", "The notification id is invalid."))?;

        Ok(Self {
            id,
            user_id: n.user_id,
            device_id: n.device_id.clone(),
            title: n.title.clone(),
            message: n.message.clone(),
            action_url: n.action_url.clone(),
            readed: n.readed,
            created_at: to_bson(n.created_at),
            readed_at: n.readed_at.map(to_bson),
            object_action: n.object_action.clone(),
        })
    }

    fn present(self) -> Notification {
        Notification {
            id: self.id.to_hex(),
            user_id: self.user_id,
            device_id: self.device_id,
            title: self.title,
            message: self.message,
            action_url: self.action_url,
            readed: self.readed,
            created_at: from_bson(self.created_at),
            readed_at: self.readed_at.map(from_bson),
            object_action: self.object_action,
        }
    }
}

fn mark_read_update() -> BsonDocument {
    doc! { "$set": { "readed": true, "readed_at": bson::DateTime::now() } }
}

// -- MongoDB --

/// [`NotificationStore`] backed by a MongoDB collection.
#[derive(Clone)]
pub struct MongoNotificationStore {
    collection: Collection<StoredNotification>,
}

impl MongoNotificationStore {
    pub fn new(db: &Database, collection: &str) -> Self {
        Self {
            collection: db.collection(collection),
        }
    }

    pub async fn connect(config: &MongoConfig) -> Result<Self, AppError> {
        let db = config.connect().await?;
        Ok(Self::new(&db, &config.collection))
    }

    async fn find_newest_first(&self, filter: BsonDocument) -> Result<Vec<Notification>, AppError> {
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(mongo_error)?;

        let records: Vec<StoredNotification> = cursor.try_collect().await.map_err(mongo_error)?;
        Ok(records.into_iter().map(StoredNotification::present).collect())
    }
}

impl NotificationStore for MongoNotificationStore {
    async fn insert(&self, notification: &Notification) -> Result<(), AppError> {
        let record = StoredNotification::from_notification(notification)?;
        self.collection
            .insert_one(&record)
            .await
            .map_err(mongo_error)?;
        Ok(())
    }

    async fn by_user(&self, user_id: i64) -> Result<Vec<Notification>, AppError> {
        self.find_newest_first(doc! { "user_id": user_id }).await
    }

    async fn by_device(&self, device_id: &str) -> Result<Vec<Notification>, AppError> {
        self.find_newest_first(doc! { "device_id": device_id }).await
    }

    async fn read_all(&self, user_id: i64) -> Result<u64, AppError> {
        let result = self
            .collection
            .update_many(doc! { "user_id": user_id, "readed": false }, mark_read_update())
            .await
            .map_err(mongo_error)?;
        Ok(result.modified_count)
    }

    async fn read_by_id(&self, id: &str) -> Result<bool, AppError> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(false);
        };

        let result = self
            .collection
            .update_one(doc! { "_id": oid, "readed": false }, mark_read_update())
            .await
            .map_err(mongo_error)?;
        Ok(result.modified_count > 0)
    }

    async fn read_by_object_action(
        &self,
        user_id: i64,
        object_id: &str,
        action: &str,
    ) -> Result<bool, AppError> {
        let filter = doc! {
            "user_id": user_id,
            "object_action.id": object_id,
            "object_action.action": action,
            "readed": false,
        };

        let result = self
            .collection
            .update_one(filter, mark_read_update())
            .await
            .map_err(mongo_error)?;
        Ok(result.modified_count > 0)
    }

    async fn clean(&self, user_id: i64) -> Result<u64, AppError> {
        let result = self
            .collection
            .delete_many(doc! { "user_id": user_id })
            .await
            .map_err(mongo_error)?;
        Ok(result.deleted_count)
    }
}

// -- In-memory --

/// [`NotificationStore`] held in process memory.
#[derive(Clone, Default)]
pub struct MemoryNotificationStore {
    items: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn select(&self, pred: impl Fn(&Notification) -> bool) -> Vec<Notification> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let mut found: Vec<_> = items.iter().rev().filter(|n| pred(n)).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    fn mark(&self, limit: Option<usize>, pred: impl Fn(&Notification) -> bool) -> u64 {
        let now = Utc::now();
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let mut count = 0;
        for n in items.iter_mut().filter(|n| pred(n)) {
            if limit.is_some_and(|l| count >= l as u64) {
                break;
            }
            if n.mark_read(now) {
                count += 1;
            }
        }
        count
    }
}

impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: &Notification) -> Result<(), AppError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if items.iter().any(|n| n.id == notification.id) {
            return Err(AppError::exists("id", "The notification already exists."));
        }
        items.push(notification.clone());
        Ok(())
    }

    async fn by_user(&self, user_id: i64) -> Result<Vec<Notification>, AppError> {
        Ok(self.select(|n| n.user_id == user_id))
    }

    async fn by_device(&self, device_id: &str) -> Result<Vec<Notification>, AppError> {
        Ok(self.select(|n| n.device_id == device_id))
    }

    async fn read_all(&self, user_id: i64) -> Result<u64, AppError> {
        Ok(self.mark(None, |n| n.user_id == user_id))
    }

    async fn read_by_id(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.mark(Some(1), |n| n.id == id && !n.readed) > 0)
    }

    async fn read_by_object_action(
        &self,
        user_id: i64,
        object_id: &str,
        action: &str,
    ) -> Result<bool, AppError> {
        let count = self.mark(Some(1), |n| {
            n.user_id == user_id
                && !n.readed
                && n
                    .object_action
                    .as_ref()
                    .is_some_and(|o| o.id == object_id && o.action == action)
        });
        Ok(count > 0)
    }

    async fn clean(&self, user_id: i64) -> Result<u64, AppError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let before = items.len();
        items.retain(|n| n.user_id != user_id);
        Ok((before - items.len()) as u64)
    }
}

// -- Service --

/// Creates notifications and pushes them to the user's device.
#[derive(Clone)]
pub struct Notifier<S: NotificationStore, P: Pusher> {
    store: S,
    pusher: P,
}

impl<S: NotificationStore, P: Pusher> Notifier<S, P> {
    pub fn new(store: S, pusher: P) -> Self {
        Self { store, pusher }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate, store, then push. A failed push is logged and does not fail
    /// the call; the stored notification is returned either way.
    pub async fn create(&self, new: &NewNotification) -> Result<Notification, AppError> {
        let out = Validation::global().request(new);
        if !out.is_valid() {
            return Err(AppError::Validation(out));
        }

        let notification = Notification::stamp(new, Utc::now());
        self.store.insert(&notification).await?;

        if let Err(e) = self.pusher.push(&notification).await {
            tracing::warn!(
                id = %notification.id,
                user_id = notification.user_id,
                error = %e,
                "Push notification failed"
            );
        }

        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::NoopPusher;

    // ---------------------------------------------------------------
    // Mock pusher
    // ---------------------------------------------------------------

    #[derive(Clone, Default)]
    struct RecordingPusher {
        pushed: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Pusher for RecordingPusher {
        async fn push(&self, notification: &Notification) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::Push("HTTP 503".into()));
            }
            self.pushed.lock().unwrap().push(notification.id.clone());
            Ok(())
        }
    }

    fn new_notification(user_id: i64, message: &str) -> NewNotification {
        NewNotification {
            user_id,
            device_id: "device-1".into(),
            title: "Order".into(),
            message: message.into(),
            action_url: "/orders/1".into(),
            object_action: Some(ObjectAction {
                id: "1".into(),
                action: "approve".into(),
            }),
        }
    }

    #[tokio::test]
    async fn test_create_validates() {
        let notifier = Notifier::new(MemoryNotificationStore::new(), NoopPusher);

        let err = notifier
            .create(&NewNotification::default())
            .await
            .unwrap_err();
        let AppError::Validation(out) = err else {
            panic!("expected validation error");
        };
        assert!(out.message("user_id").is_some());
        assert!(out.message("message").is_some());
        assert!(out.message("action_url").is_some());

        assert!(notifier.store().by_user(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_stores_and_pushes() {
        let pusher = RecordingPusher::default();
        let notifier = Notifier::new(MemoryNotificationStore::new(), pusher.clone());

        let n = notifier.create(&new_notification(5, "Approved")).await.unwrap();
        assert!(!n.readed);
        assert!(n.readed_at.is_none());
        assert_eq!(*pusher.pushed.lock().unwrap(), vec![n.id.clone()]);

        let stored = notifier.store().by_user(5).await.unwrap();
        assert_eq!(stored, vec![n]);
    }

    #[tokio::test]
    async fn test_push_failure_keeps_notification() {
        let pusher = RecordingPusher {
            fail: true,
            ..Default::default()
        };
        let notifier = Notifier::new(MemoryNotificationStore::new(), pusher);

        let n = notifier.create(&new_notification(5, "Hi")).await.unwrap();
        assert_eq!(notifier.store().by_device("device-1").await.unwrap()[0].id, n.id);
    }

    #[tokio::test]
    async fn test_memory_store_reads() {
        let store = MemoryNotificationStore::new();
        let base = Utc::now();
        let mut ids = Vec::new();
        for i in 0..3 {
            let n = Notification::stamp(
                &new_notification(9, &format!("m{i}")),
                base + chrono::Duration::seconds(i),
            );
            ids.push(n.id.clone());
            store.insert(&n).await.unwrap();
        }

        let listed = store.by_user(9).await.unwrap();
        let messages: Vec<_> = listed.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["m2", "m1", "m0"]);

        assert!(store.read_by_id(&ids[0]).await.unwrap());
        assert!(!store.read_by_id(&ids[0]).await.unwrap());
        assert!(!store.read_by_id("missing").await.unwrap());

        assert!(store.read_by_object_action(9, "1", "approve").await.unwrap());
        assert!(!store.read_by_object_action(9, "1", "reject").await.unwrap());

        assert_eq!(store.read_all(9).await.unwrap(), 1);
        assert!(store.by_user(9).await.unwrap().iter().all(|n| n.readed));

        assert_eq!(store.clean(9).await.unwrap(), 3);
        assert!(store.by_user(9).await.unwrap().is_empty());
    }
}
