//! Layered error types for the harness.
//!
//! The error hierarchy is structured for actionable test failures:
//! - [`ApiError`] - Top-level error type for all harness operations
//! - [`ClientError`] - HTTP client, URL and status errors
//! - [`ValidationError`] - Request/response body (de)serialization errors
//! - [`AuthError`] - Credential and authorization errors
//! - [`ConfigError`] - Configuration lookup errors
//! - [`ExpectationError`] - Response specification violations

mod api_error;
mod auth_error;
mod client_error;
mod config_error;
mod expectation_error;
mod validation_error;

pub use api_error::ApiError;
pub use auth_error::AuthError;
pub use client_error::ClientError;
pub use config_error::ConfigError;
pub use expectation_error::ExpectationError;
pub use validation_error::ValidationError;
