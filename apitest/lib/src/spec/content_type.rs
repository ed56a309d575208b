//! Media types understood by the specifications.

use strum::{Display, EnumIter, EnumString};

/// A media type a request declares or a response is expected to carry.
///
/// ## Examples
///
/// ```rust
/// use apitest_lib::spec::ContentType;
///
/// assert_eq!(ContentType::Json.mime(), "application/json");
/// assert!(ContentType::Json.matches("application/json; charset=utf-8"));
/// assert!(!ContentType::Json.matches("text/html"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContentType {
    /// `application/json`, also accepting `+json` structured suffixes.
    Json,
    /// `text/plain`.
    Text,
    /// `text/html`.
    Html,
    /// `application/xml`, also accepting `text/xml` and `+xml` suffixes.
    Xml,
    /// `application/x-www-form-urlencoded`.
    UrlEncoded,
    /// Matches anything; sent as `*/*`.
    Any,
}

impl ContentType {
    /// The canonical MIME type sent in a `Content-Type` header.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Text => "text/plain",
            Self::Html => "text/html",
            Self::Xml => "application/xml",
            Self::UrlEncoded => "application/x-www-form-urlencoded",
            Self::Any => "*/*",
        }
    }

    /// Returns `true` if a `Content-Type` header value denotes this type.
    ///
    /// Parameters such as `charset` are ignored, as is case.
    pub fn matches(&self, header_value: &str) -> bool {
        let essence = header_value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match self {
            Self::Any => true,
            Self::Json => essence == "application/json" || essence.ends_with("+json"),
            Self::Xml => {
                essence == "application/xml" || essence == "text/xml" || essence.ends_with("+xml")
            }
            other => essence == other.mime(),
        }
    }
}
