use chrono::{DateTime, Utc};
use mongodb::bson;

pub(crate) fn to_bson(at: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(at.timestamp_millis())
}

pub(crate) fn from_bson(at: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or_default()
}

pub(crate) fn mongo_error(e: mongodb::error::Error) -> irhabi_core::AppError {
    irhabi_core::AppError::Database(e.to_string())
}
