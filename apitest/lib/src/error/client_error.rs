use thiserror::Error;

/// HTTP client and transport errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying HTTP client failed (connect, TLS, body read, ...).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint could not be joined onto the base URL.
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A header name or value was rejected.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },
}
