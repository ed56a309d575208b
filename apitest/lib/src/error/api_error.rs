use thiserror::Error;

use super::{AuthError, ClientError, ConfigError, ExpectationError, ValidationError};

/// Top-level error returned by every fallible harness operation.
///
/// Each variant wraps one layer of the hierarchy so a failing test can
/// match on the layer that broke without string inspection.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Configuration could not be interpreted.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request could not be built or sent, or the server answered with
    /// a non-success status.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A body could not be serialized or deserialized.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Credentials were missing or rejected.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The response violated the response specification.
    #[error(transparent)]
    Expectation(#[from] ExpectationError),
}

impl ApiError {
    /// Returns the HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client(ClientError::HttpStatus { status, .. }) => Some(*status),
            Self::Auth(AuthError::AuthenticationFailed { .. }) => Some(401),
            Self::Auth(AuthError::InsufficientPermissions { .. }) => Some(403),
            Self::Auth(AuthError::TokenRequest { status, .. }) => *status,
            Self::Expectation(ExpectationError::UnexpectedStatus { actual, .. }) => Some(*actual),
            _ => None,
        }
    }
}
