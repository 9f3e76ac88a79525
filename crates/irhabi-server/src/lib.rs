//! axum composition layer for irhabi services: the response envelope,
//! validated extractors, JWT middleware, the access log, and a router
//! builder. The binary serves a demo API over the toolkit's stores.

pub mod app;
pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod logger;
pub mod openapi;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;

pub use app::{App, RouteInfo};
pub use auth::{Claims, JwtKey};
pub use config::AppConfig;
pub use error::ApiError;
pub use extract::{ListQuery, Valid};
pub use response::{Envelope, Reply};
