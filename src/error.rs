//! Failure taxonomy shared by every error type in the crate.
//!
//! Each concrete error enum (`FetchError`, `ExtractError`, `MediaError`, ...)
//! reports its [`ErrorKind`] so workers can log and count failures by kind
//! without matching on every variant.

use std::fmt;

/// Coarse classification of a per-item or enumeration failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response was received (DNS, connect, TLS, timeout, broken body).
    Transport,
    /// The server answered 429 Too Many Requests.
    RateLimited,
    /// Any other non-2xx status.
    UnexpectedStatus,
    /// Structured data could not be extracted from a fetched body.
    Extraction,
    /// Directory or file creation, or a write, failed.
    LocalIo,
    /// The bound of discoverable work could not be determined.
    Enumeration,
}

impl ErrorKind {
    /// Returns the stable label used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::RateLimited => "rate_limited",
            Self::UnexpectedStatus => "unexpected_status",
            Self::Extraction => "extraction",
            Self::LocalIo => "local_io",
            Self::Enumeration => "enumeration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
