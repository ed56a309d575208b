//! Request execution with shared specifications and tracing instrumentation.
//!
//! [`ApiClient`] owns one [`RequestSpec`] and one [`ResponseSpec`], built
//! once and shared by every request. Requests are started with
//! [`ApiClient::request`] (anonymous) or [`ApiClient::request_with_token`]
//! (bearer), or issued in one step with the typed verb helpers
//! [`get`](ApiClient::get), [`post`](ApiClient::post),
//! [`put`](ApiClient::put), [`delete`](ApiClient::delete) and the generic
//! [`execute`](ApiClient::execute).

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument, warn, Span};
use url::Url;

use crate::auth::{BearerToken, ClientCredentials, Session, TokenResponse};
use crate::config::{TestConfig, DEFAULT_TIMEOUT_MS};
use crate::error::{ApiError, AuthError, ClientError, ConfigError, ValidationError};
use crate::exchange::{header_pairs, Exchange};
use crate::method::RestMethod;
use crate::response::ApiResponse;
use crate::spec::{RequestSpec, ResponseSpec};

/// Builder for configuring an [`ApiClient`].
#[derive(Debug)]
pub struct ApiClientBuilder {
    base_url: Url,
    request_spec: RequestSpec,
    response_spec: ResponseSpec,
    accept_invalid_certs: bool,
    request_timeout: Option<Duration>,
}

impl ApiClientBuilder {
    fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_spec: RequestSpec::json(),
            response_spec: ResponseSpec::builder()
                .max_response_time(Duration::from_millis(DEFAULT_TIMEOUT_MS))
                .build(),
            accept_invalid_certs: true,
            request_timeout: None,
        }
    }

    /// Replaces the request specification shared by every request.
    pub fn request_spec(mut self, spec: RequestSpec) -> Self {
        self.request_spec = spec;
        self
    }

    /// Replaces the response specification every response is checked against.
    pub fn response_spec(mut self, spec: ResponseSpec) -> Self {
        self.response_spec = spec;
        self
    }

    /// Whether invalid or self-signed TLS certificates are accepted.
    ///
    /// Defaults to `true`. This is only appropriate against test
    /// environments; turn it off for anything else.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Aborts requests that take longer than `timeout`.
    ///
    /// Unset by default: slow responses are still received and then fail the
    /// response specification's latency bound.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds the [`ApiClient`].
    ///
    /// ## Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let mut http = reqwest::Client::builder().danger_accept_invalid_certs(self.accept_invalid_certs);
        if let Some(timeout) = self.request_timeout {
            http = http.timeout(timeout);
        }
        if self.accept_invalid_certs {
            debug!(base_url = %self.base_url, "TLS certificate validation is relaxed");
        }

        Ok(ApiClient {
            http: http.build().map_err(ClientError::Request)?,
            base_url: self.base_url,
            request_spec: Arc::new(self.request_spec),
            response_spec: Arc::new(self.response_spec),
        })
    }
}

/// Async HTTP client for API tests.
///
/// Cloning is cheap and clones share the connection pool and both
/// specifications.
///
/// ## Examples
///
/// ```rust,ignore
/// use apitest_lib::{ApiClient, TestConfig};
/// use apitest_lib::model::User;
///
/// let config = TestConfig::from_env();
/// let client = ApiClient::for_api(&config, "jsonplaceholder")?.build()?;
///
/// let users: Vec<User> = client.get(&config.endpoint("jsonplaceholder", "users")).await?;
/// assert!(!users.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    request_spec: Arc<RequestSpec>,
    response_spec: Arc<ResponseSpec>,
}

impl ApiClient {
    /// Creates a new builder for configuring an API client.
    pub fn builder(base_url: Url) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    /// Creates a client with default JSON specifications.
    ///
    /// ## Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: Url) -> Result<Self, ApiError> {
        Self::builder(base_url).build()
    }

    /// Creates a builder for the named API, preloaded from configuration:
    /// base URL, latency bound from `request.timeout`, and the `tls.relaxed`
    /// flag.
    ///
    /// ## Errors
    ///
    /// Returns a [`ConfigError`] if the base URL, timeout or TLS flag is
    /// malformed.
    pub fn for_api(config: &TestConfig, api_name: &str) -> Result<ApiClientBuilder, ApiError> {
        let raw = config.base_url(api_name);
        let base_url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
            key: if api_name.is_empty() {
                "base.url".to_string()
            } else {
                format!("api.{api_name}.base.url")
            },
            value: raw.to_string(),
            source,
        })?;

        Ok(Self::builder(base_url)
            .response_spec(ResponseSpec::from_config(config)?)
            .accept_invalid_certs(config.tls_relaxed()?))
    }

    /// Returns the base URL for this client.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The request specification shared by every request of this client.
    pub fn request_spec(&self) -> &Arc<RequestSpec> {
        &self.request_spec
    }

    /// The response specification shared by every request of this client.
    pub fn response_spec(&self) -> &Arc<ResponseSpec> {
        &self.response_spec
    }

    /// Resolves `endpoint` against the base URL.
    ///
    /// Absolute `http(s)` URLs are used as-is. Anything else is appended to
    /// the base URL's path, so a base of `http://host/api` and an endpoint of
    /// `/users` give `http://host/api/users`.
    pub fn url_for(&self, endpoint: &str) -> Result<Url, ClientError> {
        let joined = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.as_str().trim_end_matches('/'),
                endpoint.trim_start_matches('/')
            )
        };
        Url::parse(&joined).map_err(|source| ClientError::InvalidUrl {
            url: joined,
            source,
        })
    }

    /// Starts an unauthenticated request pre-loaded with the request
    /// specification.
    ///
    /// ## Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the endpoint cannot be resolved.
    pub fn request(&self, method: RestMethod, endpoint: &str) -> Result<RequestBuilder<'_>, ApiError> {
        let url = self.url_for(endpoint)?;
        let inner = self
            .request_spec
            .apply(self.http.request(method.to_reqwest(), url));
        Ok(RequestBuilder {
            client: self,
            method,
            inner,
        })
    }

    /// Starts a request carrying the session's bearer token.
    ///
    /// ## Errors
    ///
    /// Returns [`AuthError::NoToken`] if the session has no token; nothing is
    /// sent in that case.
    pub fn request_with_token(
        &self,
        method: RestMethod,
        endpoint: &str,
        session: &Session,
    ) -> Result<RequestBuilder<'_>, ApiError> {
        let token = session.token()?;
        self.request(method, endpoint)?.bearer(token)
    }

    /// Issues a call and deserializes the checked response.
    ///
    /// The response must have a 2xx status and satisfy the response
    /// specification before its body is deserialized into `T`.
    pub async fn execute<T: DeserializeOwned>(&self, call: Call<'_>) -> Result<T, ApiError> {
        let mut request = match call.session {
            Some(session) => self.request_with_token(call.method, call.endpoint, session)?,
            None => self.request(call.method, call.endpoint)?,
        };
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }
        request.send_as().await
    }

    /// GETs `endpoint` and deserializes the checked response.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.execute(Call::get(endpoint)).await
    }

    /// POSTs `body` as JSON to `endpoint` and deserializes the checked response.
    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(Call::post(endpoint).json(body)?).await
    }

    /// PUTs `body` as JSON to `endpoint` and deserializes the checked response.
    pub async fn put<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(Call::put(endpoint).json(body)?).await
    }

    /// DELETEs `endpoint`. Use `()` or `Option<T>` for bodiless responses.
    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.execute(Call::delete(endpoint)).await
    }

    /// Obtains a bearer token through the OAuth2 client-credentials flow and
    /// stores it in `session`.
    ///
    /// ## Errors
    ///
    /// Returns [`AuthError::TokenRequest`] if the token endpoint does not
    /// answer 200 with an `access_token`.
    #[instrument(skip(self, session, credentials), fields(token_url = %credentials.token_url))]
    pub async fn init_bearer_token(
        &self,
        session: &mut Session,
        credentials: &ClientCredentials,
    ) -> Result<(), ApiError> {
        let response = self
            .http
            .post(credentials.token_url.clone())
            .json(&credentials.grant())
            .send()
            .await
            .map_err(ClientError::Request)?;

        let status = response.status();
        let body = response.text().await.map_err(ClientError::Request)?;
        if status != reqwest::StatusCode::OK {
            warn!(status = status.as_u16(), "token request rejected");
            return Err(AuthError::TokenRequest {
                status: Some(status.as_u16()),
                message: body,
            }
            .into());
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(ValidationError::JsonParse)?;
        let token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::TokenRequest {
                status: Some(status.as_u16()),
                message: "token response has no access_token".to_string(),
            })?;

        session.set_token(token);
        info!("bearer token initialized");
        Ok(())
    }

    fn log_exchange(&self, exchange: &Exchange) {
        let request_detail = self.request_spec.log_detail();
        if request_detail.is_enabled() {
            info!("HTTP request\n{}", exchange.render_request(request_detail));
        }
        let response_detail = self.response_spec.log_detail();
        if response_detail.is_enabled() {
            info!("HTTP response\n{}", exchange.render_response(response_detail));
        }
    }
}

/// A request in preparation, bound to the [`ApiClient`] that created it.
#[derive(Debug)]
pub struct RequestBuilder<'c> {
    client: &'c ApiClient,
    method: RestMethod,
    inner: reqwest::RequestBuilder,
}

impl<'c> RequestBuilder<'c> {
    /// Appends query parameters.
    pub fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Self {
        self.inner = self.inner.query(query);
        self
    }

    /// Appends one query parameter.
    pub fn query_param(self, key: &str, value: impl ToString) -> Self {
        self.query(&[(key, value.to_string())])
    }

    /// Sets a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.inner = self.inner.json(body);
        self
    }

    /// Adds a header. Invalid names or values surface when the request is sent.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.inner = self.inner.header(name, value);
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    ///
    /// ## Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for an empty or non-header-safe token.
    pub fn bearer(mut self, token: &BearerToken) -> Result<Self, ApiError> {
        self.inner = self.inner.header(AUTHORIZATION, token.header_value()?);
        Ok(self)
    }

    /// Sends the request and reads the whole response.
    ///
    /// No status or specification check is applied; see
    /// [`send_as`](Self::send_as) for the checked variant.
    #[instrument(
        name = "api_request",
        skip(self),
        fields(
            http.method = tracing::field::Empty,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            http.elapsed_ms = tracing::field::Empty,
            otel.kind = "client",
        )
    )]
    pub async fn send(self) -> Result<ApiResponse, ApiError> {
        let client = self.client;
        Span::current().record("http.method", self.method.to_string().as_str());
        let request = self.inner.build().map_err(ClientError::Request)?;

        let url = request.url().clone();
        Span::current().record("http.url", url.as_str());

        let method = request.method().to_string();
        let request_headers = header_pairs(request.headers());
        let request_body = request
            .body()
            .and_then(|b| b.as_bytes())
            .map(|b| String::from_utf8_lossy(b).into_owned());

        let started = Instant::now();
        let response = client.http.execute(request).await.map_err(ClientError::Request)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(ClientError::Request)?;
        let elapsed = started.elapsed();

        Span::current().record("http.status_code", status.as_u16());
        Span::current().record("http.elapsed_ms", elapsed.as_millis() as u64);

        let exchange = Exchange {
            method,
            url: url.clone(),
            request_headers,
            request_body,
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            response_headers: header_pairs(&headers),
            response_body: String::from_utf8_lossy(&body).into_owned(),
            elapsed,
        };
        client.log_exchange(&exchange);
        for filter in client.request_spec.filters() {
            filter.on_exchange(&exchange);
        }

        Ok(ApiResponse::new(url, status, headers, body, elapsed))
    }

    /// Sends the request, requires a 2xx status, checks the client's response
    /// specification and deserializes the body.
    pub async fn send_as<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let client = self.client;
        let response = self.send().await?;
        response.ensure_success()?;
        response.validate(&client.response_spec)?;
        Ok(response.json()?)
    }
}

/// A verb call with optional body, bearer session and query parameters.
///
/// ## Examples
///
/// ```rust,ignore
/// use apitest_lib::{Call, Session};
///
/// let session = Session::with_token("abc");
/// let created: serde_json::Value = client
///     .execute(
///         Call::post("/posts")
///             .json(&serde_json::json!({ "title": "hello" }))?
///             .token(&session)
///             .query("draft", true),
///     )
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Call<'a> {
    method: RestMethod,
    endpoint: &'a str,
    body: Option<serde_json::Value>,
    session: Option<&'a Session>,
    query: Vec<(String, String)>,
}

impl<'a> Call<'a> {
    /// Starts a call without body, token or query parameters.
    pub fn new(method: RestMethod, endpoint: &'a str) -> Self {
        Self {
            method,
            endpoint,
            body: None,
            session: None,
            query: Vec::new(),
        }
    }

    /// A `GET` call.
    pub fn get(endpoint: &'a str) -> Self {
        Self::new(RestMethod::Get, endpoint)
    }

    /// A `POST` call; add a body with [`json`](Self::json).
    pub fn post(endpoint: &'a str) -> Self {
        Self::new(RestMethod::Post, endpoint)
    }

    /// A `PUT` call.
    pub fn put(endpoint: &'a str) -> Self {
        Self::new(RestMethod::Put, endpoint)
    }

    /// A `DELETE` call.
    pub fn delete(endpoint: &'a str) -> Self {
        Self::new(RestMethod::Delete, endpoint)
    }

    /// Sets an already built JSON body.
    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes `body` as the JSON body.
    ///
    /// ## Errors
    ///
    /// Returns [`ValidationError::Serialize`] if `body` cannot be represented
    /// as JSON.
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ValidationError> {
        let value = serde_json::to_value(body).map_err(ValidationError::Serialize)?;
        Ok(self.body(value))
    }

    /// Sends the session's bearer token with the call.
    pub fn token(mut self, session: &'a Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// The verb this call issues.
    pub fn method(&self) -> RestMethod {
        self.method
    }

    /// The endpoint, relative to the client's base URL or absolute.
    pub fn endpoint(&self) -> &str {
        self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExpectationError;
    use crate::report::{MemoryReport, ReportFilter};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    struct TestResponse {
        id: u64,
        name: String,
    }

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(Url::parse(&server.uri()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn get_deserializes_json() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/1"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestResponse {
                id: 1,
                name: "Alice".to_string(),
            }))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let user: TestResponse = client.get("/users/1").await.unwrap();
        assert_eq!(user.name, "Alice");
    }

    #[tokio::test]
    async fn base_path_is_preserved() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let base = Url::parse(&format!("{}/api/v1/", mock_server.uri())).unwrap();
        let client = ApiClient::new(base).unwrap();
        let users: Vec<TestResponse> = client.get("users").await.unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn post_put_delete_round_out_the_verbs() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .and(body_json(json!({"id": 7, "name": "Gus"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7, "name": "Gus"})))
            .mount(&mock_server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/users/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Gil"})))
            .mount(&mock_server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/users/7"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let created: TestResponse = client
            .post("/users", &TestResponse { id: 7, name: "Gus".to_string() })
            .await
            .unwrap();
        assert_eq!(created.id, 7);

        let updated: TestResponse = client.put("/users/7", &json!({"name": "Gil"})).await.unwrap();
        assert_eq!(updated.name, "Gil");

        let () = client.delete("/users/7").await.unwrap();
    }

    #[tokio::test]
    async fn execute_applies_query_and_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(query_param("userId", "3"))
            .and(header("authorization", "Bearer t-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "p"}])))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let session = Session::with_token("t-3");
        let posts: Vec<TestResponse> = client
            .execute(Call::get("/posts").query("userId", 3).token(&session))
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn missing_token_fails_before_sending() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let session = Session::anonymous();

        let result = client.request_with_token(RestMethod::Get, "/secure", &session);
        assert!(matches!(result, Err(ApiError::Auth(AuthError::NoToken))));

        let result: Result<serde_json::Value, _> =
            client.execute(Call::get("/secure").token(&session)).await;
        assert!(matches!(result, Err(ApiError::Auth(AuthError::NoToken))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sessions_keep_their_own_tokens() {
        let mock_server = MockServer::start().await;
        for i in 0..8u64 {
            Mock::given(method("GET"))
                .and(path("/whoami"))
                .and(header("authorization", format!("Bearer token-{i}").as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": i, "name": "me"})))
                .mount(&mock_server)
                .await;
        }

        let client = client_for(&mock_server).await;
        let mut handles = Vec::new();
        for i in 0..8u64 {
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                let mut session = Session::anonymous();
                session.set_token(format!("token-{i}"));
                for _ in 0..5 {
                    let me: TestResponse = client
                        .request_with_token(RestMethod::Get, "/whoami", &session)
                        .unwrap()
                        .send_as()
                        .await
                        .unwrap();
                    assert_eq!(me.id, i);
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn specs_are_shared_not_rebuilt() {
        let client = ApiClient::for_api(&TestConfig::parse("request.timeout=1500").unwrap(), "")
            .unwrap()
            .build()
            .unwrap();
        let clone = client.clone();

        assert!(Arc::ptr_eq(client.request_spec(), clone.request_spec()));
        assert!(Arc::ptr_eq(client.response_spec(), client.response_spec()));
        assert!(Arc::ptr_eq(client.response_spec(), clone.response_spec()));
        assert_eq!(
            client.response_spec().max_response_time(),
            Some(Duration::from_millis(1500))
        );
    }

    #[tokio::test]
    async fn slow_response_violates_spec() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": 1, "name": "slow"}))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&mock_server)
            .await;

        let client = ApiClient::builder(Url::parse(&mock_server.uri()).unwrap())
            .response_spec(
                ResponseSpec::builder()
                    .max_response_time(Duration::from_millis(50))
                    .build(),
            )
            .build()
            .unwrap();

        let result: Result<TestResponse, _> = client.get("/slow").await;
        assert!(matches!(
            result,
            Err(ApiError::Expectation(ExpectationError::ResponseTooSlow { .. }))
        ));
    }

    #[tokio::test]
    async fn http_errors_are_mapped() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/unauthorized"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid token"))
            .mount(&mock_server)
            .await;
        Mock::given(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;
        Mock::given(path("/server-error"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;

        let result: Result<TestResponse, _> = client.get("/unauthorized").await;
        assert!(matches!(
            result,
            Err(ApiError::Auth(AuthError::AuthenticationFailed { .. }))
        ));
        let result: Result<TestResponse, _> = client.get("/forbidden").await;
        assert!(matches!(
            result,
            Err(ApiError::Auth(AuthError::InsufficientPermissions { .. }))
        ));
        let result: Result<TestResponse, _> = client.get("/server-error").await;
        assert!(matches!(
            result,
            Err(ApiError::Client(ClientError::HttpStatus { status: 500, .. }))
        ));
    }

    #[tokio::test]
    async fn unchecked_send_returns_error_responses() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "nope"})))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let response = client
            .request(RestMethod::Get, "/missing")
            .unwrap()
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["error"], "nope");
    }

    #[tokio::test]
    async fn json_shape_mismatch() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/invalid-json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not valid json"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let result: Result<TestResponse, _> = client.get("/invalid-json").await;
        assert!(matches!(
            result,
            Err(ApiError::Validation(ValidationError::JsonParse(_)))
        ));
    }

    #[tokio::test]
    async fn report_filter_sees_every_exchange() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let report = Arc::new(MemoryReport::new());
        let client = ApiClient::builder(Url::parse(&mock_server.uri()).unwrap())
            .request_spec(
                RequestSpec::builder()
                    .filter(Arc::new(ReportFilter::new(report.clone(), "list users")))
                    .build(),
            )
            .build()
            .unwrap();

        let session = Session::with_token("hidden-value");
        let _: Vec<TestResponse> = client
            .execute(Call::get("/users").token(&session))
            .await
            .unwrap();

        let request = report.find("list users - HTTP Request").unwrap();
        assert!(request.content.contains("Request method:\tGET"));
        assert!(request.content.contains("authorization=Bearer ********"));
        assert!(!request.content.contains("hidden-value"));
        assert!(report.find("list users - HTTP Response").is_some());
    }

    #[tokio::test]
    async fn init_bearer_token_uses_client_credentials() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_json(json!({
                "grant_type": "client_credentials",
                "client_id": "suite",
                "client_secret": "shh",
                "audience": "https://api.test"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let credentials = ClientCredentials {
            token_url: Url::parse(&format!("{}/oauth/token", mock_server.uri())).unwrap(),
            client_id: "suite".to_string(),
            client_secret: "shh".to_string(),
            audience: Some("https://api.test".to_string()),
        };

        let mut session = Session::anonymous();
        client.init_bearer_token(&mut session, &credentials).await.unwrap();
        assert_eq!(session.token().unwrap().as_str(), "fresh-token");
    }

    #[tokio::test]
    async fn init_bearer_token_rejects_non_200() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad client"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let credentials = ClientCredentials {
            token_url: Url::parse(&format!("{}/oauth/token", mock_server.uri())).unwrap(),
            client_id: "suite".to_string(),
            client_secret: "wrong".to_string(),
            audience: None,
        };

        let mut session = Session::anonymous();
        let result = client.init_bearer_token(&mut session, &credentials).await;
        assert!(matches!(
            result,
            Err(ApiError::Auth(AuthError::TokenRequest { status: Some(401), .. }))
        ));
        assert!(!session.has_token());
    }

    #[test]
    fn for_api_rejects_bad_base_url() {
        let config = TestConfig::parse("api.broken.base.url=::nope::").unwrap();
        let result = ApiClient::for_api(&config, "broken");
        assert!(matches!(
            result,
            Err(ApiError::Config(ConfigError::InvalidUrl { ref key, .. })) if key == "api.broken.base.url"
        ));
    }

    #[test]
    fn for_api_surfaces_bad_timeout() {
        let config = TestConfig::parse("request.timeout=abc").unwrap();
        assert!(matches!(
            ApiClient::for_api(&config, "demo"),
            Err(ApiError::Config(ConfigError::InvalidTimeout { .. }))
        ));
    }

    #[test]
    fn for_api_carries_tls_flag() {
        let relaxed = ApiClient::for_api(&TestConfig::default(), "demo").unwrap();
        assert!(format!("{relaxed:?}").contains("accept_invalid_certs: true"));

        let strict = ApiClient::for_api(&TestConfig::parse("tls.relaxed=false").unwrap(), "demo").unwrap();
        assert!(format!("{strict:?}").contains("accept_invalid_certs: false"));
        assert!(strict.build().is_ok());

        assert!(matches!(
            ApiClient::for_api(&TestConfig::parse("tls.relaxed=sometimes").unwrap(), "demo"),
            Err(ApiError::Config(ConfigError::InvalidBool { .. }))
        ));
    }

    #[test]
    fn url_for_resolves_relative_and_absolute() {
        let client = ApiClient::new(Url::parse("https://api.test/v2").unwrap()).unwrap();
        assert_eq!(client.url_for("/users").unwrap().as_str(), "https://api.test/v2/users");
        assert_eq!(client.url_for("users").unwrap().as_str(), "https://api.test/v2/users");
        assert_eq!(
            client.url_for("http://other.test/x").unwrap().as_str(),
            "http://other.test/x"
        );
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn exchanges_are_logged() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/logged"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "x"})))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let _: TestResponse = client.get("/logged").await.unwrap();

        assert!(logs_contain("api_request"));
        assert!(logs_contain("HTTP request"));
        assert!(logs_contain("HTTP response"));
    }
}
