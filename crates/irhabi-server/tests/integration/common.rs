use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use irhabi_server::config::AppConfig;
use irhabi_server::routes;
use irhabi_server::state::AppState;

pub const TEST_JWT_SECRET: &str = "integration-secret";

/// Router over in-memory stores.
pub fn setup_test_app() -> Router {
    setup_with_config(AppConfig::with_secret(TEST_JWT_SECRET))
}

pub fn setup_with_config(config: AppConfig) -> Router {
    routes::router(Arc::new(AppState::in_memory(config)))
}

/// Send a request and decode the JSON body (`Null` when empty).
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Register an account and log in, returning the token.
pub async fn register_and_login(router: &Router, name: &str, email: &str) -> String {
    let (status, _) = send(
        router,
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({"name": name, "email": email, "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        router,
        Method::POST,
        "/v1/auth/login",
        None,
        Some(json!({"email": email, "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}
