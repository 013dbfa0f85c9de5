//! reqwest-backed [`Transport`] implementation.
//!
//! One `HttpClient` is built at startup and shared by every worker. It
//! carries the forum's age-consent cookie, a browser User-Agent and the
//! configured timeouts. Bodies are exposed as streams so media is written to
//! disk chunk by chunk.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::Client;
use reqwest::cookie::Jar;
use reqwest::header::RETRY_AFTER;
use tokio_util::io::StreamReader;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{
    BROWSER_USER_AGENT, CONNECT_TIMEOUT_SECS, CONSENT_COOKIE_NAME, CONSENT_COOKIE_VALUE,
    POOL_IDLE_TIMEOUT_SECS, POOL_MAX_IDLE_PER_HOST, REQUEST_TIMEOUT_SECS,
};
use super::error::FetchError;
use super::{FetchResponse, Transport};

/// Timeouts and connection pool sizing for [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Total time allowed for one request, body included.
    pub timeout: Duration,
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// How long an idle connection is kept.
    pub pool_idle_timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            pool_max_idle_per_host: POOL_MAX_IDLE_PER_HOST,
            pool_idle_timeout: Duration::from_secs(POOL_IDLE_TIMEOUT_SECS),
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Builds a cookie jar holding the age-consent cookie for `base_url`.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] if `base_url` does not parse.
pub fn consent_cookie_jar(base_url: &str) -> Result<Arc<Jar>, FetchError> {
    let url = Url::parse(base_url).map_err(|_| FetchError::invalid_url(base_url))?;
    let jar = Jar::default();
    jar.add_cookie_str(
        &format!("{CONSENT_COOKIE_NAME}={CONSENT_COOKIE_VALUE}; Path=/"),
        &url,
    );
    Ok(Arc::new(jar))
}

/// HTTP client shared by every pipeline worker.
///
/// Cloning is cheap; clones share the same connection pool.
///
/// # Example
///
/// ```no_run
/// use ptt_spider::transport::{ClientOptions, HttpClient, PTT_BASE_URL, consent_cookie_jar};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let jar = consent_cookie_jar(PTT_BASE_URL)?;
/// let client = HttpClient::new(&ClientOptions::default(), Some(jar))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the given options and optional cookie jar.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot be
    /// initialised.
    #[instrument(level = "debug", skip(cookie_jar))]
    pub fn new(options: &ClientOptions, cookie_jar: Option<Arc<Jar>>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.timeout)
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .pool_idle_timeout(options.pool_idle_timeout)
            .gzip(true)
            .user_agent(options.user_agent.as_str());
        if let Some(jar) = cookie_jar {
            builder = builder.cookie_provider(jar);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self.client.get(parsed).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::network(url, e)
            }
        })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(std::string::ToString::to_string);
        debug!(status, "response received");

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let body = StreamReader::new(Box::pin(stream));

        Ok(FetchResponse::new(url, status, Box::new(body)).with_retry_after(retry_after))
    }
}
