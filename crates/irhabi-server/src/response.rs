//! The JSON envelope every endpoint responds with.
//!
//! ```json
//! {"status": "success", "data": [...], "total": 42}
//! {"status": "fail", "message": "Unprocessable Entity", "errors": {"email": "..."}}
//! ```

use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAIL: &str = "fail";

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Response body shared by successes and failures. Empty fields are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "is_zero")]
    pub total: i64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl<T> Envelope<T> {
    pub fn success(data: Option<T>, total: i64) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: None,
            data,
            total,
            errors: BTreeMap::new(),
        }
    }

    pub fn fail(message: impl Into<String>, errors: BTreeMap<String, String>) -> Self {
        Self {
            status: STATUS_FAIL.to_string(),
            message: Some(message.into()),
            data: None,
            total: 0,
            errors,
        }
    }
}

/// Canonical reason phrase, e.g. `Unprocessable Entity`.
pub fn reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

/// A handler response: status code plus envelope.
///
/// A reply carrying field errors is always sent as `422` with its data
/// dropped.
#[derive(Debug, Clone)]
pub struct Reply<T> {
    code: StatusCode,
    body: Envelope<T>,
}

impl<T: Serialize> Reply<T> {
    /// `200` with `data`.
    pub fn data(data: T) -> Self {
        Self {
            code: StatusCode::OK,
            body: Envelope::success(Some(data), 0),
        }
    }

    /// `200` with a page of `data` and the total number of matching items.
    pub fn list(data: T, total: i64) -> Self {
        Self {
            code: StatusCode::OK,
            body: Envelope::success(Some(data), total),
        }
    }

    /// Override the status code, e.g. `201` after a create.
    pub fn with_status(mut self, code: StatusCode) -> Self {
        self.code = code;
        self
    }

    /// Add a field error; the reply becomes a `422` failure.
    pub fn failure(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.body.errors.insert(field.into(), message.into());
        self
    }
}

impl Reply<()> {
    /// `200` without data.
    pub fn empty() -> Self {
        Self {
            code: StatusCode::OK,
            body: Envelope::success(None, 0),
        }
    }

    /// A `422` carrying a single field error.
    pub fn fail(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::empty().failure(field, message)
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        let Reply { code, body } = self;
        if body.errors.is_empty() {
            return (code, Json(body)).into_response();
        }

        let code = StatusCode::UNPROCESSABLE_ENTITY;
        let body: Envelope<()> = Envelope::fail(reason(code), body.errors);
        (code, Json(body)).into_response()
    }
}
