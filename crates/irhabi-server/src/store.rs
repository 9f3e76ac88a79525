//! Backends selected at startup.
//!
//! Each enum picks between a real backend and an in-process one so the
//! demo API runs without MySQL or MongoDB.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use irhabi_core::AppError;
use irhabi_core::common::password_hash;
use irhabi_db::{Database, NewUser, Page, RequestQuery, User, UserStore};
use irhabi_docs::{
    Document, MemoryNotificationStore, MemoryVersionStore, MongoNotificationStore,
    MongoVersionStore, NoopPusher, Notification, NotificationStore, OneSignal, Pusher,
    VersionStore,
};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum Users {
    Sql(Database),
    Memory(MemoryUserStore),
}

impl Users {
    pub async fn health(&self) -> Result<(), AppError> {
        match self {
            Users::Sql(db) => db.health_check().await,
            Users::Memory(_) => Ok(()),
        }
    }
}

impl UserStore for Users {
    async fn create(&self, user: &NewUser) -> Result<User, AppError> {
        match self {
            Users::Sql(db) => db.user_repo().create(user).await,
            Users::Memory(m) => m.create(user).await,
        }
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<User>, AppError> {
        match self {
            Users::Sql(db) => db.user_repo().find_by_id(id).await,
            Users::Memory(m) => m.find_by_id(id).await,
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match self {
            Users::Sql(db) => db.user_repo().find_by_email(email).await,
            Users::Memory(m) => m.find_by_email(email).await,
        }
    }

    async fn list(&self, rq: &RequestQuery) -> Result<Page<User>, AppError> {
        match self {
            Users::Sql(db) => db.user_repo().list(rq).await,
            Users::Memory(m) => m.list(rq).await,
        }
    }
}

/// [`UserStore`] held in process memory. Filters and ordering from a
/// [`RequestQuery`] are evaluated against each user's JSON form; `fields`
/// projections are ignored.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<Mutex<Vec<User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        users.iter().find(|u| pred(u)).cloned()
    }
}

impl UserStore for MemoryUserStore {
    async fn create(&self, user: &NewUser) -> Result<User, AppError> {
        let hashed = password_hash(&user.password)?;

        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::exists("email", "The email has already been taken."));
        }

        let created = User {
            id: users.last().map_or(1, |u| u.id + 1),
            name: user.name.clone(),
            email: user.email.clone(),
            password: hashed,
            is_active: true,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<User>, AppError> {
        Ok(self.find(|u| u.id == id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn list(&self, rq: &RequestQuery) -> Result<Page<User>, AppError> {
        let cond = rq.condition();
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner).clone();

        let mut matched: Vec<(Value, User)> = users
            .into_iter()
            .map(|u| (serde_json::to_value(&u).unwrap_or(Value::Null), u))
            .filter(|(json, _)| cond.matches(json))
            .collect();

        if !rq.order_by.is_empty() {
            matched.sort_by(|(a, _), (b, _)| {
                rq.order_by.iter().fold(Ordering::Equal, |acc, order| {
                    acc.then_with(|| {
                        let (field, desc) = match order.strip_prefix('-') {
                            Some(field) => (field, true),
                            None => (order.as_str(), false),
                        };
                        let ord = compare(&a[field], &b[field]);
                        if desc { ord.reverse() } else { ord }
                    })
                })
            });
        }

        let total = matched.len() as i64;
        let offset = usize::try_from(rq.offset).unwrap_or(usize::MAX);
        let limit = rq
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(Page {
            items: matched.into_iter().skip(offset).take(limit).map(|(_, u)| u).collect(),
            total,
        })
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum Notifications {
    Mongo(MongoNotificationStore),
    Memory(MemoryNotificationStore),
}

impl NotificationStore for Notifications {
    async fn insert(&self, notification: &Notification) -> Result<(), AppError> {
        match self {
            Notifications::Mongo(s) => s.insert(notification).await,
            Notifications::Memory(s) => s.insert(notification).await,
        }
    }

    async fn by_user(&self, user_id: i64) -> Result<Vec<Notification>, AppError> {
        match self {
            Notifications::Mongo(s) => s.by_user(user_id).await,
            Notifications::Memory(s) => s.by_user(user_id).await,
        }
    }

    async fn by_device(&self, device_id: &str) -> Result<Vec<Notification>, AppError> {
        match self {
            Notifications::Mongo(s) => s.by_device(device_id).await,
            Notifications::Memory(s) => s.by_device(device_id).await,
        }
    }

    async fn read_all(&self, user_id: i64) -> Result<u64, AppError> {
        match self {
            Notifications::Mongo(s) => s.read_all(user_id).await,
            Notifications::Memory(s) => s.read_all(user_id).await,
        }
    }

    async fn read_by_id(&self, id: &str) -> Result<bool, AppError> {
        match self {
            Notifications::Mongo(s) => s.read_by_id(id).await,
            Notifications::Memory(s) => s.read_by_id(id).await,
        }
    }

    async fn read_by_object_action(
        &self,
        user_id: i64,
        object_id: &str,
        action: &str,
    ) -> Result<bool, AppError> {
        match self {
            Notifications::Mongo(s) => s.read_by_object_action(user_id, object_id, action).await,
            Notifications::Memory(s) => s.read_by_object_action(user_id, object_id, action).await,
        }
    }

    async fn clean(&self, user_id: i64) -> Result<u64, AppError> {
        match self {
            Notifications::Mongo(s) => s.clean(user_id).await,
            Notifications::Memory(s) => s.clean(user_id).await,
        }
    }
}

#[derive(Clone)]
pub enum Push {
    OneSignal(OneSignal),
    Noop(NoopPusher),
}

impl Pusher for Push {
    async fn push(&self, notification: &Notification) -> Result<(), AppError> {
        match self {
            Push::OneSignal(p) => p.push(notification).await,
            Push::Noop(p) => p.push(notification).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Document versions
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum Versions {
    Mongo(MongoVersionStore),
    Memory(MemoryVersionStore),
}

impl VersionStore for Versions {
    async fn create(
        &self,
        doc_type: &str,
        id: i64,
        data: &Value,
        user: &Value,
    ) -> Result<Document, AppError> {
        match self {
            Versions::Mongo(s) => s.create(doc_type, id, data, user).await,
            Versions::Memory(s) => s.create(doc_type, id, data, user).await,
        }
    }

    async fn show(&self, doc_type: &str, id: i64, version: Option<i64>) -> Result<Document, AppError> {
        match self {
            Versions::Mongo(s) => s.show(doc_type, id, version).await,
            Versions::Memory(s) => s.show(doc_type, id, version).await,
        }
    }

    async fn history(&self, doc_type: &str, id: i64) -> Result<Vec<Document>, AppError> {
        match self {
            Versions::Mongo(s) => s.history(doc_type, id).await,
            Versions::Memory(s) => s.history(doc_type, id).await,
        }
    }

    async fn clean(&self, doc_type: &str, id: i64) -> Result<u64, AppError> {
        match self {
            Versions::Mongo(s) => s.clean(doc_type, id).await,
            Versions::Memory(s) => s.clean(doc_type, id).await,
        }
    }
}
