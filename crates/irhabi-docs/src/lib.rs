//! MongoDB-backed document versioning and user notifications, with push
//! delivery through OneSignal.

mod bson_time;
pub mod config;
pub mod notify;
pub mod push;
pub mod versioning;

pub use config::MongoConfig;
pub use notify::{
    MemoryNotificationStore, MongoNotificationStore, NewNotification, Notification,
    NotificationStore, Notifier, ObjectAction,
};
pub use push::{NoopPusher, OneSignal, Pusher};
pub use versioning::{Document, MemoryVersionStore, MongoVersionStore, VersionStore};
