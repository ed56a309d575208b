use thiserror::Error;

/// Credential and authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// An authenticated request was attempted on a session that never
    /// received a token.
    #[error("no bearer token initialized for this session")]
    NoToken,

    /// The server rejected the credentials (HTTP 401).
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The credentials are valid but lack access (HTTP 403).
    #[error("insufficient permissions for {operation}")]
    InsufficientPermissions { operation: String },

    /// The token endpoint did not hand out a usable token.
    #[error("token request failed: {message}")]
    TokenRequest {
        status: Option<u16>,
        message: String,
    },

    /// The token contains characters that cannot be sent in a header.
    #[error("bearer token is not a valid header value")]
    InvalidToken,
}
