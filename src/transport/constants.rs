//! Constants for the transport module (site origin, timeouts, headers).

use std::time::Duration;

/// Origin of the forum.
pub const PTT_BASE_URL: &str = "https://www.ptt.cc";

/// Name of the age-consent cookie the forum checks before serving boards.
pub const CONSENT_COOKIE_NAME: &str = "over18";

/// Value of the age-consent cookie.
pub const CONSENT_COOKIE_VALUE: &str = "1";

/// Browser User-Agent sent with every request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default total request timeout (30 seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default idle connections kept per host.
pub const POOL_MAX_IDLE_PER_HOST: usize = 20;

/// Default idle connection lifetime (90 seconds).
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Maximum Retry-After value (1 hour) honoured when logging hints.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);
