//! Bearer credentials and the OAuth2 client-credentials flow.
//!
//! Credentials travel explicitly: each test owns a [`Session`] and passes it
//! to [`ApiClient::request_with_token`](crate::ApiClient::request_with_token).
//! Two tests running concurrently therefore never see each other's token,
//! and a test that never obtained a token gets [`AuthError::NoToken`]
//! instead of sending an empty `Authorization` header.

use std::fmt;

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::TestConfig;
use crate::error::{AuthError, ConfigError};

/// Environment variable that overrides `auth.client.secret`.
pub const CLIENT_SECRET_ENV: &str = "APITEST_CLIENT_SECRET";

/// An opaque access token sent as `Authorization: Bearer <token>`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw access token. A leading `Bearer ` prefix is stripped.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        match token.strip_prefix("Bearer ") {
            Some(raw) => Self(raw.to_string()),
            None => Self(token),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The full `Authorization` header value.
    ///
    /// ## Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the token is empty or holds
    /// characters that are not allowed in a header.
    pub fn header_value(&self) -> Result<HeaderValue, AuthError> {
        if self.0.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }
        let mut value =
            HeaderValue::try_from(format!("Bearer {}", self.0)).map_err(|_| AuthError::InvalidToken)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(********)")
    }
}

impl From<&str> for BearerToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for BearerToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

/// Per-test credential context.
///
/// Starts anonymous; gains a token through [`Session::set_token`] or
/// [`ApiClient::init_bearer_token`](crate::ApiClient::init_bearer_token).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<BearerToken>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<BearerToken>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn set_token(&mut self, token: impl Into<BearerToken>) {
        self.token = Some(token.into());
    }

    pub fn clear(&mut self) {
        self.token = None;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Returns the session's token.
    ///
    /// ## Errors
    ///
    /// Returns [`AuthError::NoToken`] if no token was ever set.
    pub fn token(&self) -> Result<&BearerToken, AuthError> {
        self.token.as_ref().ok_or(AuthError::NoToken)
    }
}

/// OAuth2 client-credentials grant parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub token_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub audience: Option<String>,
}

impl ClientCredentials {
    /// Reads `auth.token.url`, `auth.client.id`, `auth.client.secret` and the
    /// optional `auth.audience`.
    ///
    /// The secret may come from `APITEST_CLIENT_SECRET` instead, which wins
    /// over the file.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::MissingKey`] for an absent required key and
    /// [`ConfigError::InvalidUrl`] for an unparsable token URL.
    pub fn from_config(config: &TestConfig) -> Result<Self, ConfigError> {
        Self::resolve(config, std::env::var(CLIENT_SECRET_ENV).ok())
    }

    fn resolve(config: &TestConfig, env_secret: Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            config
                .get(key)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
        };

        let raw_url = required("auth.token.url")?;
        let token_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
            key: "auth.token.url".to_string(),
            value: raw_url.clone(),
            source,
        })?;

        let client_secret = match env_secret.filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => required("auth.client.secret")?,
        };

        Ok(Self {
            token_url,
            client_id: required("auth.client.id")?,
            client_secret,
            audience: config
                .get("auth.audience")
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        })
    }

    pub(crate) fn grant(&self) -> TokenGrant<'_> {
        TokenGrant {
            grant_type: "client_credentials",
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            audience: self.audience.as_deref(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"********")
            .field("audience", &self.audience)
            .finish()
    }
}

/// JSON body posted to the token endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct TokenGrant<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<&'a str>,
}

/// The fields of a token response the harness cares about.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
}
