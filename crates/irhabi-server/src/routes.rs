use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use irhabi_core::common::password_verify;
use irhabi_core::{AppError, Output};
use irhabi_db::{NewUser, UserStore};
use irhabi_docs::{NewNotification, NotificationStore, VersionStore};
use serde_json::json;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::app::App;
use crate::auth::{Claims, DEFAULT_TTL};
use crate::dto::{
    CountResponse, DocumentResponse, ErrorResponse, HealthResponse, LoginRequest,
    NotificationRequest, NotificationResponse, RegisterRequest, TokenResponse, UserResponse,
    VersionRequest,
};
use crate::error::ApiError;
use crate::extract::{ListQuery, Valid};
use crate::openapi::ApiDoc;
use crate::response::Reply;
use crate::state::AppState;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    App::new(&state.config)
        .get("/health", health)
        .post("/v1/auth/register", register)
        .post("/v1/auth/login", login)
        .authorized(|app| {
            app.get("/v1/me", me)
                .get("/v1/users", list_users)
                .get("/v1/users/{id}", get_user)
                .get("/v1/notifications", list_notifications)
                .post("/v1/notifications", create_notification)
                .put("/v1/notifications/read", read_all_notifications)
                .put("/v1/notifications/{id}/read", read_notification)
                .get("/v1/documents/{doc_type}/{id}", document_history)
                .post("/v1/documents/{doc_type}/{id}", create_document_version)
                .get("/v1/documents/{doc_type}/{id}/{version}", show_document_version)
        })
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .build(state)
}

fn claimed_user_id(claims: &Claims) -> Result<i64, AppError> {
    claims
        .id()
        .ok_or_else(|| AppError::Unauthorized("token has no user id".into()))
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 415, description = "Body is not JSON", body = ErrorResponse),
        (status = 422, description = "Validation failed or email taken", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Valid(body): Valid<RegisterRequest>,
) -> Result<Reply<UserResponse>, ApiError> {
    let user = state.users.create(&NewUser::from(body)).await?;
    tracing::info!(user_id = user.id, "Registered user");
    Ok(Reply::data(UserResponse::from(user)).with_status(StatusCode::CREATED))
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed token", body = TokenResponse),
        (status = 422, description = "Unknown email or wrong password", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Valid(body): Valid<LoginRequest>,
) -> Result<Reply<TokenResponse>, ApiError> {
    let user = state
        .users
        .find_by_email(&body.email)
        .await?
        .ok_or_else(|| AppError::not_exists("email", "The email is not registered."))?;

    if !user.is_active || !password_verify(&user.password, &body.password) {
        return Err(AppError::Validation(Output::with_error(
            "password",
            "The password is incorrect.",
        ))
        .into());
    }

    let token = state.jwt.issue("id", json!(user.id), DEFAULT_TTL)?;
    Ok(Reply::data(TokenResponse {
        token,
        user: user.into(),
    }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "The token's user", body = UserResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    claims: Claims,
) -> Result<Reply<UserResponse>, ApiError> {
    let user = claims.load_user(&state.users).await?;
    Ok(Reply::data(user.into()))
}

#[utoipa::path(
    get,
    path = "/v1/users",
    params(
        ("perpage" = Option<u64>, Query, description = "Page size"),
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("orderby" = Option<String>, Query, description = "Comma separated columns, `-` prefix for descending"),
        ("conditions" = Option<String>, Query, description = "Filter groups, e.g. `name__icontains:jo,Or.id__gt:3`"),
    ),
    responses(
        (status = 200, description = "One page of users with the total count", body = [UserResponse]),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ListQuery(rq): ListQuery,
) -> Result<Reply<Vec<UserResponse>>, ApiError> {
    let page = state.users.list(&rq).await?;
    let items = page.items.into_iter().map(UserResponse::from).collect();
    Ok(Reply::list(items, page.total))
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    params(("id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 422, description = "No such user", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Reply<UserResponse>, ApiError> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_exists("id", "The user is not exists."))?;
    Ok(Reply::data(user.into()))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/notifications",
    responses(
        (status = 200, description = "The caller's notifications, newest first", body = [NotificationResponse]),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    claims: Claims,
) -> Result<Reply<Vec<NotificationResponse>>, ApiError> {
    let user_id = claimed_user_id(&claims)?;
    let items: Vec<NotificationResponse> = state
        .notifier
        .store()
        .by_user(user_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = items.len() as i64;
    Ok(Reply::list(items, total))
}

#[utoipa::path(
    post,
    path = "/v1/notifications",
    request_body = NotificationRequest,
    responses(
        (status = 201, description = "Notification stored and pushed", body = NotificationResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    Valid(body): Valid<NotificationRequest>,
) -> Result<Reply<NotificationResponse>, ApiError> {
    let notification = state.notifier.create(&NewNotification::from(body)).await?;
    Ok(Reply::data(notification.into()).with_status(StatusCode::CREATED))
}

#[utoipa::path(
    put,
    path = "/v1/notifications/read",
    responses(
        (status = 200, description = "Number of notifications marked read", body = CountResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn read_all_notifications(
    State(state): State<Arc<AppState>>,
    claims: Claims,
) -> Result<Reply<CountResponse>, ApiError> {
    let user_id = claimed_user_id(&claims)?;
    let updated = state.notifier.store().read_all(user_id).await?;
    Ok(Reply::data(CountResponse { updated }))
}

#[utoipa::path(
    put,
    path = "/v1/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked read"),
        (status = 422, description = "No unread notification with that id", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn read_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Reply<()>, ApiError> {
    if !state.notifier.store().read_by_id(&id).await? {
        return Err(AppError::not_exists("id", "The notification is not exists.").into());
    }
    Ok(Reply::empty())
}

// ---------------------------------------------------------------------------
// Document versions
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/documents/{doc_type}/{id}",
    params(
        ("doc_type" = String, Path, description = "Record type, e.g. `invoice`"),
        ("id" = i64, Path, description = "Record ID"),
    ),
    responses(
        (status = 200, description = "Every version, newest first", body = [DocumentResponse]),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "documents"
)]
pub async fn document_history(
    State(state): State<Arc<AppState>>,
    Path((doc_type, id)): Path<(String, i64)>,
) -> Result<Reply<Vec<DocumentResponse>>, ApiError> {
    let items: Vec<DocumentResponse> = state
        .versions
        .history(&doc_type, id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = items.len() as i64;
    Ok(Reply::list(items, total))
}

#[utoipa::path(
    get,
    path = "/v1/documents/{doc_type}/{id}/{version}",
    params(
        ("doc_type" = String, Path, description = "Record type"),
        ("id" = i64, Path, description = "Record ID"),
        ("version" = i64, Path, description = "Version number, 0 for the latest"),
    ),
    responses(
        (status = 200, description = "One version", body = DocumentResponse),
        (status = 422, description = "No such version", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "documents"
)]
pub async fn show_document_version(
    State(state): State<Arc<AppState>>,
    Path((doc_type, id, version)): Path<(String, i64, i64)>,
) -> Result<Reply<DocumentResponse>, ApiError> {
    let doc = state.versions.show(&doc_type, id, Some(version)).await?;
    Ok(Reply::data(doc.into()))
}

#[utoipa::path(
    post,
    path = "/v1/documents/{doc_type}/{id}",
    params(
        ("doc_type" = String, Path, description = "Record type"),
        ("id" = i64, Path, description = "Record ID"),
    ),
    request_body = VersionRequest,
    responses(
        (status = 201, description = "Snapshot stored as the next version", body = DocumentResponse),
        (status = 422, description = "Missing data", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "documents"
)]
pub async fn create_document_version(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path((doc_type, id)): Path<(String, i64)>,
    Valid(body): Valid<VersionRequest>,
) -> Result<Reply<DocumentResponse>, ApiError> {
    let author = json!({ "id": claims.id() });
    let doc = state
        .versions
        .create(&doc_type, id, &body.data, &author)
        .await?;
    Ok(Reply::data(doc.into()).with_status(StatusCode::CREATED))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Reply<HealthResponse> {
    let (status, database) = match state.users.health().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "error"),
    };

    let response = HealthResponse {
        status: if database == "ok" { "healthy" } else { "unhealthy" },
        database,
    };
    Reply::data(response).with_status(status)
}
