use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use irhabi_server::config::AppConfig;

use crate::integration::common::{register_and_login, send, setup_test_app, setup_with_config};

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app();

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["database"], "ok");
}

#[tokio::test]
async fn register_login_and_me() {
    let app = setup_test_app();
    let token = register_and_login(&app, "Alya Putri", "alya@example.com").await;

    let (status, body) = send(&app, Method::GET, "/v1/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alya@example.com");
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn register_validation_failures_are_422() {
    let app = setup_test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({"name": "Alya", "email": "not-an-email", "password": "123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "fail");
    assert!(body["errors"]["email"].is_string());
    assert!(body["errors"]["password"].is_string());
    assert!(body["errors"].get("name").is_none());

    let (status, body) = send(&app, Method::POST, "/v1/auth/register", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["name"].is_string());
}

#[tokio::test]
async fn duplicate_email_is_422() {
    let app = setup_test_app();
    register_and_login(&app, "Alya", "alya@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({"name": "Other", "email": "alya@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["email"], "The email has already been taken.");
}

#[tokio::test]
async fn login_failures() {
    let app = setup_test_app();
    register_and_login(&app, "Alya", "alya@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/login",
        None,
        Some(json!({"email": "nobody@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["email"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/login",
        None,
        Some(json!({"email": "alya@example.com", "password": "wrong-one"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["password"].is_string());
}

#[tokio::test]
async fn non_json_body_is_415() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::post("/v1/auth/login")
                .header("content-type", "text/plain")
                .body(Body::from("email=a"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn malformed_json_is_400() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::post("/v1/auth/login")
                .header("content-type", "application/json")
                .body(Body::from("{\"email\":"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["message"].as_str().unwrap().starts_with("syntax error"));
}

#[tokio::test]
async fn missing_token_is_400_and_bad_token_is_401() {
    let app = setup_test_app();

    let (status, _) = send(&app, Method::GET, "/v1/me", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/v1/me", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn token_from_other_secret_is_401() {
    let other = setup_with_config(AppConfig::with_secret("another-secret"));
    let token = register_and_login(&other, "Alya", "alya@example.com").await;

    let app = setup_test_app();
    let (status, _) = send(&app, Method::GET, "/v1/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_users_with_query() {
    let app = setup_test_app();
    let token = register_and_login(&app, "Alya", "alya@example.com").await;
    register_and_login(&app, "Budi", "budi@example.com").await;
    register_and_login(&app, "Citra", "citra@example.com").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/users?perpage=2&orderby=-id",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["name"], "Citra");

    let (_, body) = send(
        &app,
        Method::GET,
        "/v1/users?conditions=email__istartswith:BUDI",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "Budi");
}

#[tokio::test]
async fn list_users_paging_bounds() {
    let app = setup_test_app();
    let token = register_and_login(&app, "Alya", "alya@example.com").await;
    register_and_login(&app, "Budi", "budi@example.com").await;

    let cases = [
        ("/v1/users?perpage=0&page=0", 2),
        ("/v1/users?perpage=1&page=0", 1),
        ("/v1/users?perpage=18446744073709551615&page=3", 0),
        ("/v1/users?perpage=5&page=18446744073709551615", 0),
        ("/v1/users?perpage=99999999999999999999999", 2),
    ];
    for (uri, len) in cases {
        let (status, body) = send(&app, Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["total"], 2, "{uri}");
        assert_eq!(body["data"].as_array().unwrap().len(), len, "{uri}");
    }
}

#[tokio::test]
async fn unknown_user_is_422() {
    let app = setup_test_app();
    let token = register_and_login(&app, "Alya", "alya@example.com").await;

    let (status, body) = send(&app, Method::GET, "/v1/users/99", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["id"].is_string());
}

#[tokio::test]
async fn notifications_flow() {
    let app = setup_test_app();
    let token = register_and_login(&app, "Alya", "alya@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/notifications",
        Some(&token),
        Some(json!({
            "user_id": 1,
            "title": "Invoice",
            "message": "Invoice #7 needs approval",
            "action_url": "/invoices/7",
            "object_action": {"id": "7", "action": "approve"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["readed"], false);

    let (_, body) = send(&app, Method::GET, "/v1/notifications", Some(&token), None).await;
    assert_eq!(body["total"], 1);

    let uri = format!("/v1/notifications/{id}/read");
    let (status, _) = send(&app, Method::PUT, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::PUT, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["id"].is_string());

    let (status, body) = send(&app, Method::PUT, "/v1/notifications/read", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], 0);
}

#[tokio::test]
async fn invalid_notification_is_422() {
    let app = setup_test_app();
    let token = register_and_login(&app, "Alya", "alya@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/notifications",
        Some(&token),
        Some(json!({"title": "No recipient"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["user_id"].is_string());
    assert!(body["errors"]["message"].is_string());
}

#[tokio::test]
async fn document_versions() {
    let app = setup_test_app();
    let token = register_and_login(&app, "Alya", "alya@example.com").await;

    for total in [10, 20] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/documents/invoice/7",
            Some(&token),
            Some(json!({"data": {"total": total}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["updated_by"], json!({"id": 1}));
    }

    let (_, body) = send(&app, Method::GET, "/v1/documents/invoice/7", Some(&token), None).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["data"][0]["version"], 2);

    let (_, body) = send(&app, Method::GET, "/v1/documents/invoice/7/1", Some(&token), None).await;
    assert_eq!(body["data"]["data"], json!({"total": 10}));

    let (_, body) = send(&app, Method::GET, "/v1/documents/invoice/7/0", Some(&token), None).await;
    assert_eq!(body["data"]["version"], 2);

    let (status, body) =
        send(&app, Method::GET, "/v1/documents/invoice/7/5", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["version"].is_string());
}

#[tokio::test]
async fn unknown_route_is_404_envelope() {
    let app = setup_test_app();

    let (status, body) = send(&app, Method::GET, "/v2/nothing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn head_request_is_204() {
    let app = setup_test_app();

    let (status, body) = send(&app, Method::HEAD, "/health", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_test_app();

    let (status, body) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/auth/login"].is_object());
}
