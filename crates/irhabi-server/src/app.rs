//! Router composition.
//!
//! [`App`] collects routes, keeps a table of what was registered, and wraps
//! the finished router in the standard middleware stack:
//!
//! - access log (outermost)
//! - permissive CORS
//! - gzip, when enabled
//! - security headers
//! - error redaction, outside debug mode
//! - panic recovery with a `500` envelope
//! - `204` for `HEAD` and `OPTIONS` that are not CORS preflights

use std::any::{Any, type_name};
use std::fmt;

use axum::Router;
use axum::extract::Request;
use axum::handler::Handler;
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, delete, get, patch, post, put};
use irhabi_core::AppError;
use secrecy::ExposeSecret;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::auth::{JwtKey, require_jwt};
use crate::config::AppConfig;
use crate::error::{ApiError, redact_errors};
use crate::logger::access_log;

/// One registered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    /// Fully qualified handler name.
    pub handler: &'static str,
    /// Whether the route sits behind [`require_jwt`].
    pub protected: bool,
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lock = if self.protected { " [jwt]" } else { "" };
        write!(f, "{:<7} {} -> {}{lock}", self.method, self.path, self.handler)
    }
}

/// Router builder.
///
/// ```ignore
/// let router = App::new(&config)
///     .get("/health", health)
///     .authorized(|app| app.get("/v1/me", me))
///     .build(state);
/// ```
pub struct App<S> {
    public: Router<S>,
    protected: Router<S>,
    routes: Vec<RouteInfo>,
    in_auth: bool,
    has_protected: bool,
    jwt: JwtKey,
    debug: bool,
    gzip: bool,
}

impl<S> App<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(config: &AppConfig) -> Self {
        Self {
            public: Router::new(),
            protected: Router::new(),
            routes: Vec::new(),
            in_auth: false,
            has_protected: false,
            jwt: JwtKey::from_secret(config.jwt_secret.expose_secret().as_bytes()),
            debug: config.debug,
            gzip: config.gzip,
        }
    }

    pub fn get<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(Method::GET, path, type_name::<H>(), get(handler))
    }

    pub fn post<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(Method::POST, path, type_name::<H>(), post(handler))
    }

    pub fn put<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(Method::PUT, path, type_name::<H>(), put(handler))
    }

    pub fn patch<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(Method::PATCH, path, type_name::<H>(), patch(handler))
    }

    pub fn delete<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(Method::DELETE, path, type_name::<H>(), delete(handler))
    }

    /// Register the routes added inside `f` behind JWT authentication.
    pub fn authorized(mut self, f: impl FnOnce(Self) -> Self) -> Self {
        let outer = self.in_auth;
        self.in_auth = true;
        let mut app = f(self);
        app.in_auth = outer;
        app
    }

    /// Mount a prebuilt router, e.g. Swagger UI. Its routes are not listed
    /// in the route table. Inside [`App::authorized`] they require a token
    /// like any other protected route; `other` must have at least one route.
    pub fn merge<R>(mut self, other: R) -> Self
    where
        R: Into<Router<S>>,
    {
        if self.in_auth {
            self.has_protected = true;
            self.protected = self.protected.merge(other);
        } else {
            self.public = self.public.merge(other);
        }
        self
    }

    /// Routes registered so far, in registration order.
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    fn route(mut self, method: Method, path: &str, handler: &'static str, mr: MethodRouter<S>) -> Self {
        self.routes.push(RouteInfo {
            method,
            path: path.to_string(),
            handler,
            protected: self.in_auth,
        });
        if self.in_auth {
            self.has_protected = true;
            self.protected = self.protected.route(path, mr);
        } else {
            self.public = self.public.route(path, mr);
        }
        self
    }

    /// Attach the state and the middleware stack.
    pub fn build(self, state: S) -> Router {
        if self.debug {
            log_routes(&self.routes);
        }

        let mut protected = self.protected;
        if self.has_protected {
            protected = protected.route_layer(middleware::from_fn_with_state(
                self.jwt.clone(),
                require_jwt,
            ));
        }

        let mut router = self
            .public
            .merge(protected)
            .fallback(not_found)
            .method_not_allowed_fallback(method_not_allowed)
            .layer(middleware::from_fn(empty_head_options))
            .layer(CatchPanicLayer::custom(handle_panic));

        if !self.debug {
            router = router.layer(middleware::map_response(redact_errors));
        }

        router = router
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-xss-protection"),
                HeaderValue::from_static("1; mode=block"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-content-type-options"),
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-frame-options"),
                HeaderValue::from_static("SAMEORIGIN"),
            ));

        if self.gzip {
            router = router.layer(CompressionLayer::new());
        }

        router
            .layer(cors())
            .layer(middleware::from_fn(access_log))
            .with_state(state)
    }
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AnyOrigin)
}

/// Print the route table sorted by path.
pub fn log_routes(routes: &[RouteInfo]) {
    let mut sorted: Vec<_> = routes.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.method.as_str().cmp(b.method.as_str())));
    for route in sorted {
        tracing::debug!("{route}");
    }
}

async fn not_found() -> ApiError {
    AppError::http(404, "Not Found").into()
}

async fn method_not_allowed() -> ApiError {
    AppError::http(405, "Method Not Allowed").into()
}

async fn empty_head_options(req: Request, next: Next) -> Response {
    if req.method() == Method::HEAD || req.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    next.run(req).await
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "Handler panicked");

    ApiError(AppError::http(500, detail)).into_response()
}
