//! Log and transcript detail levels.

use strum::{Display, EnumIter, EnumString};

/// How much of a request or response is written to the log and to report
/// transcripts.
///
/// `All` includes every part; any other variant includes only that part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogDetail {
    /// Nothing is logged.
    None,
    /// The request method.
    Method,
    /// The request URI.
    Uri,
    /// Request or response headers.
    Headers,
    /// Request or response body.
    Body,
    /// The response status line.
    Status,
    /// Everything.
    #[default]
    All,
}

impl LogDetail {
    /// Returns `true` if `part` is covered by this detail level.
    pub fn includes(self, part: LogDetail) -> bool {
        match self {
            Self::None => false,
            Self::All => part != Self::None,
            own => own == part,
        }
    }

    /// Returns `true` if anything at all is logged.
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }
}
