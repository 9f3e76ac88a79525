use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use irhabi_core::AppError;

use crate::response::{Envelope, reason};

/// Wrapper so we can implement `IntoResponse` for `AppError`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

/// Envelope to send instead of the detailed one when debug mode is off.
/// Attached to error responses as an extension and swapped in by
/// [`redact_errors`].
#[derive(Debug, Clone)]
pub struct Redacted(pub Envelope<()>);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if !self.0.is_client_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let mut errors = BTreeMap::new();

        let (status, detail) = match self.0 {
            AppError::Http { status, message } => (error_status(status), Some(message)),
            AppError::Validation(out) => {
                errors = out.messages().clone();
                (StatusCode::UNPROCESSABLE_ENTITY, None)
            }
            AppError::DataNotExists { field, message } | AppError::DataExists { field, message } => {
                errors.insert(field, message);
                (StatusCode::UNPROCESSABLE_ENTITY, None)
            }
            AppError::Database(message) => (StatusCode::BAD_REQUEST, Some(message)),
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, Some(message)),
            AppError::Serialization(e) => (StatusCode::BAD_REQUEST, Some(e.to_string())),
            other => (StatusCode::INTERNAL_SERVER_ERROR, Some(other.to_string())),
        };

        let public = reason(status);
        let body: Envelope<()> = Envelope::fail(detail.unwrap_or_else(|| public.clone()), errors.clone());
        let mut response = (status, Json(body)).into_response();
        response
            .extensions_mut()
            .insert(Redacted(Envelope::fail(public, errors)));
        response
    }
}

/// Only 4xx and 5xx codes are sent for an `Http` error; anything else is 500.
fn error_status(code: u16) -> StatusCode {
    match StatusCode::from_u16(code) {
        Ok(status) if status.is_client_error() || status.is_server_error() => status,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Replace detailed error messages with the status reason phrase.
pub async fn redact_errors(mut response: Response) -> Response {
    match response.extensions_mut().remove::<Redacted>() {
        Some(Redacted(body)) => (response.status(), Json(body)).into_response(),
        None => response,
    }
}
