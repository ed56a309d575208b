//! The shared response specification.

use std::time::Duration;

use super::{ContentType, LogDetail};
use crate::config::TestConfig;
use crate::error::{ConfigError, ExpectationError};
use crate::response::ApiResponse;

/// Expectations every response is checked against before it is
/// deserialized.
///
/// The default specification built by [`ResponseSpec::from_config`] only
/// bounds latency. Status and content type expectations are opt-in, either
/// through the builder or per call with [`expect_status`](Self::expect_status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSpec {
    max_response_time: Option<Duration>,
    status: Option<u16>,
    content_type: Option<ContentType>,
    log_detail: LogDetail,
}

impl ResponseSpec {
    pub fn builder() -> ResponseSpecBuilder {
        ResponseSpecBuilder::default()
    }

    /// Builds the default specification: response time strictly below
    /// `request.timeout`, full logging.
    ///
    /// The timeout is read once, here. Later configuration changes do not
    /// affect an already built specification.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] for a malformed timeout.
    pub fn from_config(config: &TestConfig) -> Result<Self, ConfigError> {
        Ok(Self::builder()
            .max_response_time(config.default_timeout_duration()?)
            .log(LogDetail::All)
            .build())
    }

    pub fn max_response_time(&self) -> Option<Duration> {
        self.max_response_time
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.content_type
    }

    pub fn log_detail(&self) -> LogDetail {
        self.log_detail
    }

    /// Returns a copy of this specification that also expects `status`.
    pub fn expect_status(&self, status: u16) -> Self {
        Self {
            status: Some(status),
            ..self.clone()
        }
    }

    /// Returns a copy of this specification that also expects `content_type`.
    pub fn expect_content_type(&self, content_type: ContentType) -> Self {
        Self {
            content_type: Some(content_type),
            ..self.clone()
        }
    }

    /// Checks `response` against every expectation.
    ///
    /// ## Errors
    ///
    /// Returns the first violated expectation, checked in the order status,
    /// content type, latency.
    pub fn validate(&self, response: &ApiResponse) -> Result<(), ExpectationError> {
        self.check(
            response.status().as_u16(),
            response.content_type(),
            response.elapsed(),
        )
    }

    /// Checks raw response facts against every expectation.
    pub fn check(
        &self,
        status: u16,
        content_type: Option<&str>,
        elapsed: Duration,
    ) -> Result<(), ExpectationError> {
        if let Some(expected) = self.status {
            if expected != status {
                return Err(ExpectationError::UnexpectedStatus {
                    expected,
                    actual: status,
                });
            }
        }

        if let Some(expected) = self.content_type {
            if !content_type.is_some_and(|actual| expected.matches(actual)) {
                return Err(ExpectationError::UnexpectedContentType {
                    expected: expected.mime().to_string(),
                    actual: content_type.map(str::to_string),
                });
            }
        }

        if let Some(limit) = self.max_response_time {
            if elapsed >= limit {
                return Err(ExpectationError::ResponseTooSlow { elapsed, limit });
            }
        }

        Ok(())
    }
}

impl Default for ResponseSpec {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for a [`ResponseSpec`].
#[derive(Debug, Default)]
pub struct ResponseSpecBuilder {
    max_response_time: Option<Duration>,
    status: Option<u16>,
    content_type: Option<ContentType>,
    log_detail: LogDetail,
}

impl ResponseSpecBuilder {
    /// Responses must arrive in strictly less than `limit`.
    pub fn max_response_time(mut self, limit: Duration) -> Self {
        self.max_response_time = Some(limit);
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn log(mut self, detail: LogDetail) -> Self {
        self.log_detail = detail;
        self
    }

    pub fn build(self) -> ResponseSpec {
        ResponseSpec {
            max_response_time: self.max_response_time,
            status: self.status,
            content_type: self.content_type,
            log_detail: self.log_detail,
        }
    }
}
