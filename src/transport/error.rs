//! Error types for the transport module.

use std::time::Duration;

use thiserror::Error;

use super::retry_after::parse_retry_after;
use crate::error::ErrorKind;

/// Boxed source error for network failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while fetching a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: BoxError,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The server answered 429 Too Many Requests.
    #[error("rate limited fetching {url}")]
    RateLimited {
        /// The URL that was throttled.
        url: String,
        /// The Retry-After header value, if present.
        retry_after: Option<String>,
    },

    /// Any other non-2xx response.
    #[error("HTTP {status} fetching {url}")]
    UnexpectedStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The response body could not be read.
    #[error("error reading body of {url}: {source}")]
    Body {
        /// The URL whose body failed.
        url: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Creates a network error from any transport failure.
    pub fn network(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Network {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a rate-limited error with the optional Retry-After value.
    pub fn rate_limited(url: impl Into<String>, retry_after: Option<String>) -> Self {
        Self::RateLimited {
            url: url.into(),
            retry_after,
        }
    }

    /// Creates an unexpected status error.
    pub fn unexpected_status(url: impl Into<String>, status: u16) -> Self {
        Self::UnexpectedStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a body read error.
    pub fn body(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::Body {
            url: url.into(),
            source,
        }
    }

    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            Self::Network { .. } | Self::Timeout { .. } | Self::InvalidUrl { .. } | Self::Body { .. } => {
                ErrorKind::Transport
            }
        }
    }

    /// Returns the URL the error refers to.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::RateLimited { url, .. }
            | Self::UnexpectedStatus { url, .. }
            | Self::InvalidUrl { url }
            | Self::Body { url, .. } => url,
        }
    }

    /// Parsed Retry-After hint of a rate-limited response.
    #[must_use]
    pub fn retry_after_hint(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after: Some(value),
                ..
            } => parse_retry_after(value),
            _ => None,
        }
    }
}
