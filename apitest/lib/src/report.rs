//! Test report attachments.
//!
//! A [`Report`] receives named text or JSON blobs for the test that is
//! currently running. [`ReportFilter`] plugs a report into a
//! [`RequestSpec`](crate::spec::RequestSpec) so every HTTP exchange is
//! attached as a request and a response transcript.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use strum::Display;
use tracing::warn;

use crate::exchange::{Exchange, ExchangeFilter};
use crate::spec::LogDetail;

/// The kind of content an attachment holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum AttachmentKind {
    #[strum(serialize = "text/plain")]
    Text,
    #[strum(serialize = "application/json")]
    Json,
}

impl AttachmentKind {
    /// File extension used when the attachment is written to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

/// A named blob attached to the current test's report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub kind: AttachmentKind,
    pub content: String,
}

/// Sink for report attachments.
///
/// Attaching never fails from the caller's point of view: a sink that cannot
/// store an attachment logs the problem instead.
pub trait Report: Send + Sync + fmt::Debug {
    fn attach(&self, attachment: Attachment);

    /// Attaches plain text.
    fn attach_text(&self, name: &str, text: &str) {
        self.attach(Attachment {
            name: name.to_string(),
            kind: AttachmentKind::Text,
            content: text.to_string(),
        });
    }

    /// Attaches a JSON document as-is.
    fn attach_json(&self, name: &str, json: &str) {
        self.attach(Attachment {
            name: name.to_string(),
            kind: AttachmentKind::Json,
            content: json.to_string(),
        });
    }
}

/// Keeps attachments in memory, in the order they were attached.
#[derive(Debug, Default)]
pub struct MemoryReport {
    attachments: Mutex<Vec<Attachment>>,
}

impl MemoryReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything attached so far.
    pub fn attachments(&self) -> Vec<Attachment> {
        match self.attachments.lock() {
            Ok(attachments) => attachments.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns the first attachment with the given name.
    pub fn find(&self, name: &str) -> Option<Attachment> {
        self.attachments().into_iter().find(|a| a.name == name)
    }
}

impl Report for MemoryReport {
    fn attach(&self, attachment: Attachment) {
        match self.attachments.lock() {
            Ok(mut attachments) => attachments.push(attachment),
            Err(poisoned) => poisoned.into_inner().push(attachment),
        }
    }
}

/// Writes each attachment to its own file in a results directory.
///
/// Files are named `<seq>-<slug>.<ext>`, `seq` counting from 1.
#[derive(Debug)]
pub struct DirectoryReport {
    dir: PathBuf,
    seq: AtomicUsize,
}

impl DirectoryReport {
    /// Creates the report, creating `dir` if needed.
    ///
    /// ## Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            seq: AtomicUsize::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Report for DirectoryReport {
    fn attach(&self, attachment: Attachment) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let file = self.dir.join(format!(
            "{seq:04}-{}.{}",
            slug(&attachment.name),
            attachment.kind.extension()
        ));
        if let Err(e) = std::fs::write(&file, &attachment.content) {
            warn!(path = %file.display(), error = %e, "failed to write report attachment");
        }
    }
}

/// An [`ExchangeFilter`] that attaches every exchange to a [`Report`].
///
/// Produces `"<label> - HTTP Request"` and `"<label> - HTTP Response"`
/// text attachments.
#[derive(Debug, Clone)]
pub struct ReportFilter {
    report: Arc<dyn Report>,
    label: String,
    detail: LogDetail,
}

impl ReportFilter {
    pub fn new(report: Arc<dyn Report>, label: impl Into<String>) -> Self {
        Self {
            report,
            label: label.into(),
            detail: LogDetail::All,
        }
    }

    /// Limits how much of each exchange is attached.
    pub fn with_detail(mut self, detail: LogDetail) -> Self {
        self.detail = detail;
        self
    }
}

impl ExchangeFilter for ReportFilter {
    fn on_exchange(&self, exchange: &Exchange) {
        self.report.attach_text(
            &format!("{} - HTTP Request", self.label),
            &exchange.render_request(self.detail),
        );
        self.report.attach_text(
            &format!("{} - HTTP Response", self.label),
            &exchange.render_response(self.detail),
        );
    }
}

fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "attachment".to_string()
    } else {
        trimmed.to_string()
    }
}
