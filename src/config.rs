//! TOML configuration file for pool sizes, channel capacities, politeness
//! delays and HTTP client tuning.
//!
//! Every field has a default, so an empty or missing file is valid:
//!
//! ```toml
//! [crawler]
//! document_workers = 10
//! media_workers = 10
//!
//! [crawler.channels]
//! documents = 100
//! media = 200
//! summaries = 100
//!
//! [crawler.delays]
//! min_ms = 500
//! max_ms = 2000
//!
//! [crawler.http]
//! timeout_secs = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{info, warn};

use crate::governor::DelayWindow;
use crate::pipeline::{
    CrawlerSettings, DEFAULT_DOCUMENT_BUFFER, DEFAULT_DOCUMENT_WORKERS, DEFAULT_MEDIA_BUFFER,
    DEFAULT_MEDIA_WORKERS, DEFAULT_SUMMARY_BUFFER,
};
use crate::transport::{
    BROWSER_USER_AGENT, CONNECT_TIMEOUT_SECS, ClientOptions, POOL_IDLE_TIMEOUT_SECS,
    POOL_MAX_IDLE_PER_HOST, PTT_BASE_URL, REQUEST_TIMEOUT_SECS,
};

/// Default lower bound of the politeness delay in milliseconds.
pub const DEFAULT_MIN_DELAY_MS: u64 = 500;

/// Default upper bound of the politeness delay in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 2000;

/// Upper limit for any worker count.
const MAX_WORKERS: usize = 100;

/// Upper limit for any channel capacity.
const MAX_CHANNEL_CAPACITY: usize = 10_000;

/// Upper limit for either delay bound (one minute).
const MAX_DELAY_MS: u64 = 60_000;

/// Root of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub crawler: CrawlerConfig,
}

/// `[crawler]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlerConfig {
    /// Forum origin.
    pub base_url: String,
    pub document_workers: usize,
    pub media_workers: usize,
    pub channels: ChannelConfig,
    pub delays: DelayConfig,
    pub http: HttpConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: PTT_BASE_URL.to_string(),
            document_workers: DEFAULT_DOCUMENT_WORKERS,
            media_workers: DEFAULT_MEDIA_WORKERS,
            channels: ChannelConfig::default(),
            delays: DelayConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// `[crawler.channels]` table: one capacity per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    pub documents: usize,
    pub media: usize,
    pub summaries: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            documents: DEFAULT_DOCUMENT_BUFFER,
            media: DEFAULT_MEDIA_BUFFER,
            summaries: DEFAULT_SUMMARY_BUFFER,
        }
    }
}

/// `[crawler.delays]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DelayConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_ms: DEFAULT_MIN_DELAY_MS,
            max_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

/// `[crawler.http]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            pool_max_idle_per_host: POOL_MAX_IDLE_PER_HOST,
            pool_idle_timeout_secs: POOL_IDLE_TIMEOUT_SECS,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl FileConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid TOML, unknown keys or wrong value types.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Invalid config TOML")
    }

    /// Validates config values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        let c = &self.crawler;
        if c.base_url.trim().is_empty() {
            bail!("Invalid config value for `crawler.base_url`: must not be empty");
        }
        validate_range("crawler.document_workers", c.document_workers, 1, MAX_WORKERS)?;
        validate_range("crawler.media_workers", c.media_workers, 1, MAX_WORKERS)?;
        validate_range(
            "crawler.channels.documents",
            c.channels.documents,
            1,
            MAX_CHANNEL_CAPACITY,
        )?;
        validate_range("crawler.channels.media", c.channels.media, 1, MAX_CHANNEL_CAPACITY)?;
        validate_range(
            "crawler.channels.summaries",
            c.channels.summaries,
            1,
            MAX_CHANNEL_CAPACITY,
        )?;

        validate_range("crawler.delays.min_ms", c.delays.min_ms, 0, MAX_DELAY_MS)?;
        validate_range("crawler.delays.max_ms", c.delays.max_ms, 0, MAX_DELAY_MS)?;
        if c.delays.min_ms > c.delays.max_ms {
            bail!(
                "Invalid config: `crawler.delays.min_ms` ({}) exceeds `crawler.delays.max_ms` ({})",
                c.delays.min_ms,
                c.delays.max_ms
            );
        }

        validate_range("crawler.http.timeout_secs", c.http.timeout_secs, 1, 3600)?;
        validate_range(
            "crawler.http.connect_timeout_secs",
            c.http.connect_timeout_secs,
            1,
            3600,
        )?;
        validate_range(
            "crawler.http.pool_idle_timeout_secs",
            c.http.pool_idle_timeout_secs,
            1,
            3600,
        )?;
        Ok(())
    }

    /// Pipeline settings writing under `output_root`.
    #[must_use]
    pub fn crawler_settings(&self, output_root: impl Into<PathBuf>) -> CrawlerSettings {
        let c = &self.crawler;
        CrawlerSettings {
            document_workers: c.document_workers,
            media_workers: c.media_workers,
            document_buffer: c.channels.documents,
            media_buffer: c.channels.media,
            summary_buffer: c.channels.summaries,
            base_url: c.base_url.trim_end_matches('/').to_string(),
            output_root: output_root.into(),
        }
    }

    /// The politeness delay window.
    ///
    /// # Errors
    ///
    /// Returns an error if `min_ms > max_ms`.
    pub fn delay_window(&self) -> Result<DelayWindow> {
        let d = &self.crawler.delays;
        Ok(DelayWindow::new(
            Duration::from_millis(d.min_ms),
            Duration::from_millis(d.max_ms),
        )?)
    }

    /// HTTP client options.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        let h = &self.crawler.http;
        ClientOptions {
            timeout: Duration::from_secs(h.timeout_secs),
            connect_timeout: Duration::from_secs(h.connect_timeout_secs),
            pool_max_idle_per_host: h.pool_max_idle_per_host,
            pool_idle_timeout: Duration::from_secs(h.pool_idle_timeout_secs),
            user_agent: h.user_agent.clone(),
        }
    }
}

fn validate_range<T>(field: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Path that was consulted.
    pub path: PathBuf,
    /// Effective configuration.
    pub config: FileConfig,
    /// Whether values came from the file rather than defaults.
    pub loaded_from_file: bool,
}

/// Loads the config file at `path`.
///
/// A missing file yields defaults. A file that cannot be read or parsed is
/// logged and also yields defaults. A file that parses but holds
/// out-of-range values is an error.
///
/// # Errors
///
/// Returns an error when [`FileConfig::validate`] rejects the parsed file.
pub fn load_config(path: &Path) -> Result<LoadedConfig> {
    let defaults = |path: &Path| LoadedConfig {
        path: path.to_path_buf(),
        config: FileConfig::default(),
        loaded_from_file: false,
    };

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "config file not found, using defaults");
            return Ok(defaults(path));
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read config file, using defaults");
            return Ok(defaults(path));
        }
    };

    let config = match FileConfig::from_toml_str(&raw) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{e:#}"), "failed to parse config file, using defaults");
            return Ok(defaults(path));
        }
    };

    config
        .validate()
        .with_context(|| format!("Invalid config file '{}'", path.display()))?;

    info!(path = %path.display(), "config loaded");
    Ok(LoadedConfig {
        path: path.to_path_buf(),
        config,
        loaded_from_file: true,
    })
}
