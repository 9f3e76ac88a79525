//! HS256 bearer tokens.
//!
//! Tokens carry one application claim (the user id under `"id"` in the demo
//! API) plus `iat` and `exp`. [`require_jwt`] guards a router; handlers
//! read the decoded claims with the [`Claims`] extractor.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use irhabi_core::AppError;
use irhabi_db::{User, UserStore};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation as JwtValidation, decode, encode,
};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Lifetime of tokens issued at login.
pub const DEFAULT_TTL: Duration = Duration::hours(72);

/// Signing and verification keys derived from one shared secret.
#[derive(Clone)]
pub struct JwtKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKey {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a token carrying `claim: value`, expiring after `ttl`.
    pub fn issue(&self, claim: &str, value: Value, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Generic(format!("token lifetime out of range: {ttl}")))?;
        let mut claims = Map::new();
        claims.insert(claim.to_string(), value);
        claims.insert("iat".to_string(), now.timestamp().into());
        claims.insert("exp".to_string(), exp.timestamp().into());

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Generic(format!("failed to sign token: {e}")))
    }

    /// Verify signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let validation = JwtValidation::new(Algorithm::HS256);
        decode::<Map<String, Value>>(token, &self.decoding, &validation)
            .map(|data| Claims(data.claims))
            .map_err(|e| AppError::Unauthorized(format!("invalid or expired jwt: {e}")))
    }
}

/// Middleware: reject requests without a valid `Authorization: Bearer`
/// token. A missing or malformed header is a `400`; a bad token is a `401`.
pub async fn require_jwt(State(key): State<JwtKey>, mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return ApiError(AppError::http(400, "missing or malformed jwt")).into_response();
    };

    match key.verify(token) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => ApiError(e).into_response(),
    }
}

/// Decoded token claims, available to handlers behind [`require_jwt`].
#[derive(Debug, Clone, PartialEq)]
pub struct Claims(pub Map<String, Value>);

impl Claims {
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    /// The `id` claim as a number. String ids are parsed.
    pub fn id(&self) -> Option<i64> {
        match self.get("id")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Fetch the user the token was issued for.
    pub async fn load_user<U: UserStore>(&self, store: &U) -> Result<User, AppError> {
        let id = self
            .id()
            .and_then(|id| u64::try_from(id).ok())
            .ok_or_else(|| AppError::Unauthorized("token has no user id".into()))?;

        store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("token user no longer exists".into()))
    }
}

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| ApiError(AppError::Unauthorized("missing jwt claims".into())))
    }
}
