//! The shared request specification.

use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use super::{ContentType, LogDetail};
use crate::error::{ApiError, ClientError};
use crate::exchange::ExchangeFilter;

/// Defaults applied to every request built by an [`ApiClient`](crate::ApiClient).
#[derive(Clone)]
pub struct RequestSpec {
    content_type: ContentType,
    headers: HeaderMap,
    filters: Vec<Arc<dyn ExchangeFilter>>,
    log_detail: LogDetail,
}

impl RequestSpec {
    /// Creates a builder starting from [`RequestSpec::json`] defaults.
    pub fn builder() -> RequestSpecBuilder {
        RequestSpecBuilder::new()
    }

    /// JSON content type, full logging, no extra headers, no filters.
    pub fn json() -> Self {
        Self {
            content_type: ContentType::Json,
            headers: HeaderMap::new(),
            filters: Vec::new(),
            log_detail: LogDetail::All,
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Extra headers sent with every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn filters(&self) -> &[Arc<dyn ExchangeFilter>] {
        &self.filters
    }

    pub fn log_detail(&self) -> LogDetail {
        self.log_detail
    }

    /// Applies the content type and default headers to `request`.
    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(CONTENT_TYPE, self.content_type.mime())
            .headers(self.headers.clone())
    }
}

impl Default for RequestSpec {
    fn default() -> Self {
        Self::json()
    }
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("content_type", &self.content_type)
            .field("headers", &self.headers)
            .field("filters", &self.filters.len())
            .field("log_detail", &self.log_detail)
            .finish()
    }
}

/// Builder for a [`RequestSpec`].
///
/// ## Examples
///
/// ```rust
/// use std::sync::Arc;
/// use apitest_lib::report::{MemoryReport, ReportFilter};
/// use apitest_lib::spec::{ContentType, LogDetail, RequestSpec};
///
/// let report = Arc::new(MemoryReport::new());
/// let spec = RequestSpec::builder()
///     .content_type(ContentType::Json)
///     .header("X-Suite", "users")?
///     .filter(Arc::new(ReportFilter::new(report, "users")))
///     .log(LogDetail::All)
///     .build();
///
/// assert_eq!(spec.filters().len(), 1);
/// # Ok::<(), apitest_lib::ApiError>(())
/// ```
#[derive(Debug)]
pub struct RequestSpecBuilder {
    spec: RequestSpec,
}

impl RequestSpecBuilder {
    fn new() -> Self {
        Self {
            spec: RequestSpec::json(),
        }
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.spec.content_type = content_type;
        self
    }

    /// Adds a header sent with every request.
    ///
    /// ## Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self, ApiError> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| ClientError::InvalidHeader(format!("invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| ClientError::InvalidHeader(format!("invalid header value: {e}")))?;
        self.spec.headers.insert(name, value);
        Ok(self)
    }

    /// Attaches a filter that observes every completed exchange.
    pub fn filter(mut self, filter: Arc<dyn ExchangeFilter>) -> Self {
        self.spec.filters.push(filter);
        self
    }

    pub fn log(mut self, detail: LogDetail) -> Self {
        self.spec.log_detail = detail;
        self
    }

    pub fn build(self) -> RequestSpec {
        self.spec
    }
}
