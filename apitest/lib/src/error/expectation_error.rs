use std::time::Duration;

use thiserror::Error;

/// A response violated the response specification it was checked against.
#[derive(Debug, Error)]
pub enum ExpectationError {
    /// The response arrived, but not within the latency bound.
    #[error("expected response time < {limit:?}, but was {elapsed:?}")]
    ResponseTooSlow { elapsed: Duration, limit: Duration },

    /// The status code differs from the expected one.
    #[error("expected status {expected}, but was {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    /// The content type differs from the expected one.
    #[error("expected content type {expected}, but was {}", actual.as_deref().unwrap_or("<none>"))]
    UnexpectedContentType {
        expected: String,
        actual: Option<String>,
    },
}
