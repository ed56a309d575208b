use thiserror::Error;

/// Body (de)serialization errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The response body does not match the requested shape.
    #[error("failed to parse JSON response: {0}")]
    JsonParse(#[source] serde_json::Error),

    /// The request body could not be turned into JSON.
    #[error("failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),
}
