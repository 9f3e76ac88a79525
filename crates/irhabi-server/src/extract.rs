//! Request extractors that bind and validate input before a handler runs.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use irhabi_core::{AppError, Validate, Validation};
use irhabi_db::RequestQuery;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::ApiError;

/// A JSON body that has been decoded and passed its validation rules.
///
/// - non-JSON content type: `415`
/// - malformed JSON or mismatched types: `400`
/// - failed rules: `422` with per-field messages
///
/// An empty body decodes as `{}` so that missing fields surface as
/// validation messages instead of a syntax error.
#[derive(Debug, Clone)]
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().starts_with("application/json"));
        if !is_json {
            return Err(AppError::http(415, "Content-Type must be application/json").into());
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::http(400, e.body_text()))?;

        let value = bind::<T>(&body)?;
        let out = Validation::global().request(&value);
        if !out.is_valid() {
            return Err(AppError::Validation(out).into());
        }
        Ok(Valid(value))
    }
}

fn bind<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };

    serde_json::from_slice(body).map_err(|e| {
        let message = match e.classify() {
            Category::Data => format!("unmarshal type error: {e}"),
            Category::Syntax | Category::Eof => format!("syntax error: {e}"),
            Category::Io => e.to_string(),
        };
        AppError::http(400, message)
    })
}

/// List parameters parsed from the query string. See [`RequestQuery`] for
/// the grammar.
#[derive(Debug, Clone, Default)]
pub struct ListQuery(pub RequestQuery);

impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::http(400, e.body_text()))?;
        Ok(ListQuery(RequestQuery::from_params(&params)))
    }
}
