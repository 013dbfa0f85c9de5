//! HTTP transport capability used by the pipeline.
//!
//! The pipeline never talks to reqwest directly. Workers call
//! [`Transport::get`] and receive a [`FetchResponse`] whose body is an
//! [`AsyncRead`] stream, so tests can swap in an in-memory fake and the real
//! [`HttpClient`] can stream media straight to disk.
//!
//! A non-2xx response is still a successful `get`; callers decide what to do
//! with it through [`FetchResponse::error_for_status`].

mod client;
mod constants;
mod error;
mod retry_after;

use std::fmt;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

pub use client::{ClientOptions, HttpClient, consent_cookie_jar};
pub use constants::{
    BROWSER_USER_AGENT, CONNECT_TIMEOUT_SECS, CONSENT_COOKIE_NAME, CONSENT_COOKIE_VALUE,
    MAX_RETRY_AFTER, POOL_IDLE_TIMEOUT_SECS, POOL_MAX_IDLE_PER_HOST, PTT_BASE_URL,
    REQUEST_TIMEOUT_SECS,
};
pub use error::{BoxError, FetchError};
pub use retry_after::parse_retry_after;

/// Streamed response body.
pub type ResponseBody = Box<dyn AsyncRead + Send + Unpin>;

/// Shared GET capability. Implementations must be safe for concurrent use.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a GET request for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when no response was received. Responses with
    /// any status code are returned as `Ok`.
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// A received response: status, Retry-After header and streamed body.
pub struct FetchResponse {
    url: String,
    status: u16,
    retry_after: Option<String>,
    body: ResponseBody,
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("retry_after", &self.retry_after)
            .finish_non_exhaustive()
    }
}

impl FetchResponse {
    /// Creates a response from its parts.
    pub fn new(url: impl Into<String>, status: u16, body: ResponseBody) -> Self {
        Self {
            url: url.into(),
            status,
            retry_after: None,
            body,
        }
    }

    /// Attaches the raw Retry-After header value.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Option<String>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// The requested URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw Retry-After header value, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<&str> {
        self.retry_after.as_deref()
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Passes 2xx responses through and classifies everything else.
    ///
    /// # Errors
    ///
    /// - [`FetchError::RateLimited`] for 429
    /// - [`FetchError::UnexpectedStatus`] for any other non-2xx status
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.is_success() {
            return Ok(self);
        }
        match self.status {
            429 => Err(FetchError::rate_limited(self.url, self.retry_after)),
            status => Err(FetchError::unexpected_status(self.url, status)),
        }
    }

    /// Consumes the response, returning the body stream.
    #[must_use]
    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Reads the whole body as text, replacing invalid UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Body`] if reading the stream fails.
    pub async fn text(mut self) -> Result<String, FetchError> {
        let mut buf = Vec::new();
        self.body
            .read_to_end(&mut buf)
            .await
            .map_err(|e| FetchError::body(self.url.clone(), e))?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
