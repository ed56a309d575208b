//! Request/response transcripts.
//!
//! Every request sent through an [`ApiClient`](crate::ApiClient) produces an
//! [`Exchange`]. It is logged according to the specifications' [`LogDetail`]
//! and handed to each [`ExchangeFilter`] of the request specification.

use std::fmt::{self, Write};
use std::time::Duration;

use reqwest::header::{HeaderMap, AUTHORIZATION};
use url::Url;

use crate::spec::LogDetail;

/// Observer of completed exchanges, attached to a
/// [`RequestSpec`](crate::spec::RequestSpec).
pub trait ExchangeFilter: Send + Sync + fmt::Debug {
    /// Called once per exchange, after the response body has been read.
    fn on_exchange(&self, exchange: &Exchange);
}

/// One request and the response it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub method: String,
    pub url: Url,
    pub request_headers: Vec<(String, String)>,
    pub request_body: Option<String>,
    pub status: u16,
    pub reason: Option<String>,
    pub response_headers: Vec<(String, String)>,
    pub response_body: String,
    pub elapsed: Duration,
}

impl Exchange {
    /// Renders the request part at the given detail level.
    ///
    /// The `Authorization` value is masked, keeping only its scheme.
    pub fn render_request(&self, detail: LogDetail) -> String {
        let mut out = String::new();
        if detail.includes(LogDetail::Method) {
            let _ = writeln!(out, "Request method:\t{}", self.method);
        }
        if detail.includes(LogDetail::Uri) {
            let _ = writeln!(out, "Request URI:\t{}", self.url);
        }
        if detail.includes(LogDetail::Headers) {
            write_headers(&mut out, &self.request_headers);
        }
        if detail.includes(LogDetail::Body) {
            write_body(&mut out, self.request_body.as_deref());
        }
        out
    }

    /// Renders the response part at the given detail level.
    pub fn render_response(&self, detail: LogDetail) -> String {
        let mut out = String::new();
        if detail.includes(LogDetail::Status) {
            let _ = writeln!(
                out,
                "Status:\t\t{} {}",
                self.status,
                self.reason.as_deref().unwrap_or_default()
            );
            let _ = writeln!(out, "Elapsed:\t{} ms", self.elapsed.as_millis());
        }
        if detail.includes(LogDetail::Headers) {
            write_headers(&mut out, &self.response_headers);
        }
        if detail.includes(LogDetail::Body) {
            write_body(&mut out, Some(&self.response_body));
        }
        out
    }
}

/// Flattens a header map into printable pairs.
pub(crate) fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if *name == AUTHORIZATION {
                mask_credential(value.to_str().unwrap_or_default())
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}

fn mask_credential(value: &str) -> String {
    match value.split_once(' ') {
        Some((scheme, _)) => format!("{scheme} ********"),
        None => "********".to_string(),
    }
}

fn write_headers(out: &mut String, headers: &[(String, String)]) {
    if headers.is_empty() {
        let _ = writeln!(out, "Headers:\t<none>");
        return;
    }
    for (i, (name, value)) in headers.iter().enumerate() {
        let label = if i == 0 { "Headers:" } else { "" };
        let _ = writeln!(out, "{label}\t{name}={value}");
    }
}

fn write_body(out: &mut String, body: Option<&str>) {
    match body.filter(|b| !b.trim().is_empty()) {
        None => {
            let _ = writeln!(out, "Body:\t\t<none>");
        }
        Some(body) => {
            let pretty = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| serde_json::to_string_pretty(&v).ok());
            let _ = writeln!(out, "Body:\n{}", pretty.as_deref().unwrap_or(body));
        }
    }
}
