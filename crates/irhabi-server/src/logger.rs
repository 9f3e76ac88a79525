use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::response::reason;

/// One log line per request: `GET/200 3.2ms 10.0.0.1 /v1/users OK`.
///
/// Responses below 400 log at info, the rest at error.
pub async fn access_log(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), |p| p.to_string());
    let requester = requester(&req);

    let response = next.run(req).await;

    let status = response.status();
    let prefix = format!("{method}/{}", status.as_u16());
    let latency = format!("{:.1}ms", start.elapsed().as_secs_f64() * 1000.0);
    let message = reason(status);

    if status.as_u16() < 400 {
        tracing::info!(%prefix, %latency, %requester, %path, "{message}");
    } else {
        tracing::error!(%prefix, %latency, %requester, %path, "{message}");
    }
    response
}

/// First `X-Forwarded-For` hop, else the peer address when the server was
/// started with connect info.
fn requester(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "-".to_string(), |ConnectInfo(addr)| addr.ip().to_string())
}
