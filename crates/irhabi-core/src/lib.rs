//! Shared building blocks for irhabi services: the error type, request
//! validation, environment helpers, and small conversion utilities.

pub mod common;
pub mod convert;
pub mod date;
pub mod env;
pub mod error;
pub mod telemetry;
pub mod validation;

pub use error::AppError;
pub use validation::{Output, Rules, ToValue, Validate, Validation, Value};
