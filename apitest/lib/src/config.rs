//! Properties-file configuration for API test suites.
//!
//! A [`TestConfig`] is loaded once, at suite start, from a flat `key=value`
//! properties file and then handed to everything that needs it. Lookups degrade to
//! documented defaults instead of failing:
//!
//! | key | default |
//! |-----|---------|
//! | `base.url` | [`DEFAULT_BASE_URL`] |
//! | `api.<name>.base.url` | `base.url` |
//! | `api.<name>.endpoint.<endpoint>` | `/<endpoint>` |
//! | `request.timeout` | [`DEFAULT_TIMEOUT_MS`] |
//! | `tls.relaxed` | `true` |
//!
//! ## Examples
//!
//! ```rust
//! use apitest_lib::TestConfig;
//!
//! let config: TestConfig = "base.url=http://example.test\n".parse().unwrap();
//! assert_eq!(config.base_url("demo"), "http://example.test");
//! assert_eq!(config.endpoint("demo", "users"), "/users");
//! assert_eq!(config.default_timeout().unwrap(), 10_000);
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ConfigError;

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.properties";

/// Environment variable naming an alternative configuration file.
pub const CONFIG_PATH_ENV: &str = "APITEST_CONFIG";

/// Base URL used when neither an API-specific nor a global URL is set.
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// Expected maximum response time, in milliseconds, when unset.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

const BASE_URL_KEY: &str = "base.url";
const TIMEOUT_KEY: &str = "request.timeout";
const TLS_RELAXED_KEY: &str = "tls.relaxed";

/// Immutable key/value configuration for a test run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestConfig {
    properties: BTreeMap<String, String>,
    source: Option<PathBuf>,
}

impl TestConfig {
    /// Loads configuration from `path`.
    ///
    /// A missing, unreadable or malformed file is not an error: a warning is
    /// logged and an empty configuration is returned, so every lookup yields
    /// its default.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| Self::parse(&text).map_err(|e| e.to_string()));
        match parsed {
            Ok(mut config) => {
                debug!(
                    path = %path.display(),
                    keys = config.properties.len(),
                    "loaded test configuration"
                );
                config.source = Some(path.to_path_buf());
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config file, using defaults");
                Self::default()
            }
        }
    }

    /// Loads the file named by `APITEST_CONFIG`, or `config.properties` in
    /// the working directory.
    pub fn from_env() -> Self {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load(path)
    }

    /// Parses properties text.
    ///
    /// Follows the Java properties format: `=`, `:` or whitespace separates
    /// key from value, `#` and `!` start comments, a trailing backslash
    /// continues the line, and `\\`, `\:`, `\=` and `\uXXXX` escapes are
    /// decoded. Later keys override earlier ones.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed escapes.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let properties = java_properties::read(text.as_bytes())?;
        Ok(Self {
            properties: properties.into_iter().collect(),
            source: None,
        })
    }

    /// Builds a configuration from explicit key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            properties: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            source: None,
        }
    }

    /// The file this configuration was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Raw lookup of a single key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns the base URL for `api_name`.
    ///
    /// An empty name selects the global `base.url`. A named API falls back to
    /// the global URL, then to [`DEFAULT_BASE_URL`].
    pub fn base_url(&self, api_name: &str) -> &str {
        let global = || self.get(BASE_URL_KEY).unwrap_or(DEFAULT_BASE_URL);
        if api_name.is_empty() {
            return global();
        }
        debug!(api = api_name, "resolving base URL");
        self.get(&format!("api.{api_name}.base.url"))
            .unwrap_or_else(global)
    }

    /// Returns the expected maximum response time in milliseconds.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] when `request.timeout` is set
    /// but is not a non-negative integer.
    pub fn default_timeout(&self) -> Result<u64, ConfigError> {
        match self.get(TIMEOUT_KEY) {
            None => Ok(DEFAULT_TIMEOUT_MS),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidTimeout {
                    value: value.to_string(),
                    source,
                }),
        }
    }

    /// [`default_timeout`](Self::default_timeout) as a [`Duration`].
    pub fn default_timeout_duration(&self) -> Result<Duration, ConfigError> {
        self.default_timeout().map(Duration::from_millis)
    }

    /// Returns the path of endpoint `name` under `api_name`, `/<name>` when
    /// not configured.
    pub fn endpoint(&self, api_name: &str, name: &str) -> Cow<'_, str> {
        match self.get(&format!("api.{api_name}.endpoint.{name}")) {
            Some(path) => Cow::Borrowed(path),
            None => Cow::Owned(format!("/{name}")),
        }
    }

    /// Whether TLS certificate validation is relaxed (default `true`).
    pub fn tls_relaxed(&self) -> Result<bool, ConfigError> {
        self.bool_or(TLS_RELAXED_KEY, true)
    }

    fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key).map(str::trim) {
            None => Ok(default),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(v) => Err(ConfigError::InvalidBool {
                key: key.to_string(),
                value: v.to_string(),
            }),
        }
    }
}

impl FromStr for TestConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
