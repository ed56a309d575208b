use thiserror::Error;

/// Configuration lookup errors.
///
/// Missing keys and missing files are not errors: lookups fall back to
/// defaults. Only values that are present but unusable end up here.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `request.timeout` is present but not a non-negative integer.
    #[error("invalid request.timeout '{value}': {source}")]
    InvalidTimeout {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A URL-valued key does not hold a valid absolute URL.
    #[error("invalid URL for {key}: '{value}': {source}")]
    InvalidUrl {
        key: String,
        value: String,
        #[source]
        source: url::ParseError,
    },

    /// A key without a sensible default is required but absent.
    #[error("missing required configuration key: {0}")]
    MissingKey(String),

    /// The properties text is malformed, e.g. a bad `\uXXXX` escape.
    #[error("malformed properties: {0}")]
    Parse(#[from] java_properties::PropertiesError),

    /// A boolean-valued key holds something other than true/false.
    #[error("invalid boolean for {key}: '{value}'")]
    InvalidBool { key: String, value: String },
}
