//! A fully read HTTP response.

use std::borrow::Cow;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ApiError, AuthError, ClientError, ExpectationError, ValidationError};
use crate::spec::ResponseSpec;

/// Status, headers, body and latency of one response.
///
/// The body has already been read, so every accessor is synchronous and the
/// response can be inspected any number of times.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    url: Url,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    elapsed: Duration,
}

impl ApiResponse {
    pub(crate) fn new(
        url: Url,
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
        elapsed: Duration,
    ) -> Self {
        Self {
            url,
            status,
            headers,
            body,
            elapsed,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Time from sending the request until the body was fully read.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// The body as text, lossily decoded.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserializes the JSON body.
    ///
    /// An empty body is read as JSON `null`, so `()` and `Option<T>` accept
    /// bodiless responses.
    ///
    /// ## Errors
    ///
    /// Returns [`ValidationError::JsonParse`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ValidationError> {
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &self.body
        };
        serde_json::from_slice(body).map_err(ValidationError::JsonParse)
    }

    /// Checks this response against a response specification.
    pub fn validate(&self, spec: &ResponseSpec) -> Result<&Self, ExpectationError> {
        spec.validate(self)?;
        Ok(self)
    }

    /// Requires an exact status code.
    pub fn ensure_status(&self, expected: u16) -> Result<&Self, ExpectationError> {
        if self.status.as_u16() == expected {
            Ok(self)
        } else {
            Err(ExpectationError::UnexpectedStatus {
                expected,
                actual: self.status.as_u16(),
            })
        }
    }

    /// Requires a 2xx status.
    ///
    /// ## Errors
    ///
    /// 401 maps to [`AuthError::AuthenticationFailed`], 403 to
    /// [`AuthError::InsufficientPermissions`], anything else to
    /// [`ClientError::HttpStatus`] carrying the response body.
    pub fn ensure_success(&self) -> Result<&Self, ApiError> {
        if self.status.is_success() {
            return Ok(self);
        }

        let body = self.text();
        let message = if body.trim().is_empty() {
            self.status.to_string()
        } else {
            body.into_owned()
        };

        match self.status.as_u16() {
            401 => Err(AuthError::AuthenticationFailed { message }.into()),
            403 => Err(AuthError::InsufficientPermissions {
                operation: self.url.path().to_string(),
            }
            .into()),
            status => Err(ClientError::HttpStatus { status, message }.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn response(status: u16, body: &'static str) -> ApiResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        ApiResponse::new(
            Url::parse("http://example.test/users").unwrap(),
            StatusCode::from_u16(status).unwrap(),
            headers,
            Bytes::from_static(body.as_bytes()),
            Duration::from_millis(5),
        )
    }

    #[derive(Debug, serde::Deserialize)]
    struct Item {
        id: u64,
    }

    #[test]
    fn json_body_parses() {
        let items: Vec<Item> = response(200, r#"[{"id":1},{"id":2}]"#).json().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, 2);
    }

    #[test]
    fn empty_body_parses_as_null() {
        response(204, "").json::<()>().unwrap();
        let nothing: Option<Item> = response(200, "  ").json().unwrap();
        assert!(nothing.is_none());
    }

    #[test]
    fn shape_mismatch_is_a_validation_error() {
        let result: Result<Vec<Item>, _> = response(200, r#"{"id":1}"#).json();
        assert!(matches!(result, Err(ValidationError::JsonParse(_))));
    }

    #[test]
    fn ensure_success_maps_status_codes() {
        assert!(response(201, "{}").ensure_success().is_ok());
        assert!(matches!(
            response(401, "expired").ensure_success(),
            Err(ApiError::Auth(AuthError::AuthenticationFailed { message })) if message == "expired"
        ));
        assert!(matches!(
            response(403, "").ensure_success(),
            Err(ApiError::Auth(AuthError::InsufficientPermissions { operation })) if operation == "/users"
        ));
        assert!(matches!(
            response(404, "").ensure_success(),
            Err(ApiError::Client(ClientError::HttpStatus { status: 404, message })) if message == "404 Not Found"
        ));
    }

    #[test]
    fn ensure_status_and_accessors() {
        let r = response(200, "[]");
        assert!(r.ensure_status(200).is_ok());
        assert!(matches!(
            r.ensure_status(201),
            Err(ExpectationError::UnexpectedStatus { expected: 201, actual: 200 })
        ));
        assert_eq!(r.content_type(), Some("application/json"));
        assert_eq!(r.header("content-type"), Some("application/json"));
        assert_eq!(r.text(), "[]");
        assert_eq!(r.elapsed(), Duration::from_millis(5));
    }
}
