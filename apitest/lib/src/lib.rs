//! Building blocks for REST API test suites.
//!
//! This library provides configuration lookup, shared request/response
//! specifications, a typed async HTTP client with explicit bearer-token
//! sessions, and hooks for attaching HTTP transcripts to a test report.
//!
//! ## Core Types
//!
//! - [`TestConfig`] - Properties-file configuration with documented defaults
//! - [`ApiClient`] - Client sharing one request and one response specification
//! - [`RequestBuilder`] - A request in preparation (query, body, headers, token)
//! - [`Call`] - Verb + endpoint + optional body, token and query parameters
//! - [`ApiResponse`] - A fully read response with assertion helpers
//! - [`Session`] / [`BearerToken`] - Per-test credentials
//!
//! ## Specifications
//!
//! - [`spec::RequestSpec`] - Content type, default headers, filters, log detail
//! - [`spec::ResponseSpec`] - Latency bound, optional status and content type
//!
//! ## Reporting
//!
//! - [`report::Report`] - Sink for named text/JSON attachments
//! - [`report::ReportFilter`] - Attaches every exchange to a report
//!
//! ## Examples
//!
//! ```rust,ignore
//! use apitest_lib::{ApiClient, TestConfig};
//! use apitest_lib::model::User;
//!
//! let config = TestConfig::from_env();
//! let client = ApiClient::for_api(&config, "jsonplaceholder")?.build()?;
//! let users: Vec<User> = client.get(&config.endpoint("jsonplaceholder", "users")).await?;
//! ```

pub mod auth;
mod client;
pub mod config;
pub mod error;
pub mod exchange;
mod method;
pub mod model;
pub mod report;
mod response;
pub mod spec;

pub use auth::{BearerToken, ClientCredentials, Session};
pub use client::{ApiClient, ApiClientBuilder, Call, RequestBuilder};
pub use config::TestConfig;
pub use error::ApiError;
pub use method::RestMethod;
pub use response::ApiResponse;
