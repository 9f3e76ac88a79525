use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use irhabi_core::{Rules, Validate};
use irhabi_db::{NewUser, User};
use irhabi_docs::{Document, NewNotification, Notification, ObjectAction};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Auth & users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    /// At least 6 characters
    pub password: String,
}

impl From<RegisterRequest> for NewUser {
    fn from(r: RegisterRequest) -> Self {
        NewUser {
            name: r.name,
            email: r.email,
            password: r.password,
        }
    }
}

impl Validate for RegisterRequest {
    fn rules(&self, v: &mut Rules<'_>) {
        NewUser::from(self.clone()).rules(v);
    }
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn rules(&self, v: &mut Rules<'_>) {
        v.field("email", &self.email, "required|email")
            .field("password", &self.password, "required");
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TokenResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ObjectActionDto {
    pub id: String,
    pub action: String,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct NotificationRequest {
    pub user_id: i64,
    /// OneSignal player id; leave empty to skip the push
    pub device_id: String,
    pub title: String,
    pub message: String,
    pub action_url: String,
    pub object_action: Option<ObjectActionDto>,
}

impl From<NotificationRequest> for NewNotification {
    fn from(r: NotificationRequest) -> Self {
        NewNotification {
            user_id: r.user_id,
            device_id: r.device_id,
            title: r.title,
            message: r.message,
            action_url: r.action_url,
            object_action: r.object_action.map(|o| ObjectAction {
                id: o.id,
                action: o.action,
            }),
        }
    }
}

impl Validate for NotificationRequest {
    fn rules(&self, v: &mut Rules<'_>) {
        NewNotification::from(self.clone()).rules(v);
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct NotificationResponse {
    pub id: String,
    pub user_id: i64,
    pub device_id: String,
    pub title: String,
    pub message: String,
    pub action_url: String,
    pub readed: bool,
    pub created_at: DateTime<Utc>,
    pub readed_at: Option<DateTime<Utc>>,
    pub object_action: Option<ObjectActionDto>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            device_id: n.device_id,
            title: n.title,
            message: n.message,
            action_url: n.action_url,
            readed: n.readed,
            created_at: n.created_at,
            readed_at: n.readed_at,
            object_action: n.object_action.map(|o| ObjectActionDto {
                id: o.id,
                action: o.action,
            }),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CountResponse {
    pub updated: u64,
}

// ---------------------------------------------------------------------------
// Document versions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct VersionRequest {
    /// Full snapshot of the record
    pub data: serde_json::Value,
}

impl Validate for VersionRequest {
    fn rules(&self, v: &mut Rules<'_>) {
        v.field("data", &self.data, "required");
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DocumentResponse {
    pub doc_type: String,
    pub id: i64,
    pub version: i64,
    pub stored_at: DateTime<Utc>,
    pub data: serde_json::Value,
    pub updated_by: serde_json::Value,
}

impl From<Document> for DocumentResponse {
    fn from(d: Document) -> Self {
        Self {
            doc_type: d.doc_type,
            id: d.id,
            version: d.version,
            stored_at: d.stored_at,
            data: d.data,
            updated_by: d.updated_by,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Body of every failed response. Successful responses carry `status`
/// `"success"` with the payload under `data` and, for lists, `total`.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Always `"fail"`
    pub status: String,
    pub message: String,
    /// Field path to message, for validation failures
    pub errors: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}
