//! Reusable request and response specifications.
//!
//! A [`RequestSpec`] bundles the defaults every request starts from
//! (content type, default headers, exchange filters, log detail). A
//! [`ResponseSpec`] bundles the expectations every response is checked
//! against (latency bound, optional status and content type).
//!
//! Both are immutable once built. [`ApiClient`](crate::ApiClient) keeps one
//! of each behind an `Arc`, so every request in a run shares the identical
//! instance.

mod content_type;
mod log_detail;
mod request;
mod response;

pub use content_type::ContentType;
pub use log_detail::LogDetail;
pub use request::{RequestSpec, RequestSpecBuilder};
pub use response::{ResponseSpec, ResponseSpecBuilder};
