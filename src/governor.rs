//! Politeness delay applied before every network call.
//!
//! Every document worker and media worker calls [`RateGovernor::pause`]
//! independently before fetching. The governor is not a shared budget: it
//! only draws a random duration inside a `[min, max]` window and sleeps,
//! returning early if the run is cancelled.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ptt_spider::governor::{DelayWindow, RateGovernor};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let window = DelayWindow::new(Duration::from_millis(500), Duration::from_millis(2000)).unwrap();
//! let governor = RateGovernor::seeded(window);
//! let cancel = CancellationToken::new();
//! governor.pause(&cancel).await;
//! # }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Error returned for an inverted delay window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid delay window: min {min:?} exceeds max {max:?}")]
pub struct InvalidDelayWindow {
    /// Requested lower bound.
    pub min: Duration,
    /// Requested upper bound.
    pub max: Duration,
}

/// Inclusive-exclusive `[min, max)` window for politeness delays.
///
/// When `min == max` the delay is exactly `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    min: Duration,
    max: Duration,
}

impl DelayWindow {
    /// Creates a window.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDelayWindow`] if `min > max`.
    pub fn new(min: Duration, max: Duration) -> Result<Self, InvalidDelayWindow> {
        if min > max {
            return Err(InvalidDelayWindow { min, max });
        }
        Ok(Self { min, max })
    }

    /// A window that never waits.
    #[must_use]
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Lower bound.
    #[must_use]
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }
}

/// Source of random delays inside a window.
pub trait JitterSource: Send + Sync {
    /// Returns a duration in `[window.min(), window.max())`, or `min` when
    /// the window is empty.
    fn sample(&self, window: DelayWindow) -> Duration;
}

/// Pseudo-random jitter seeded once at construction.
#[derive(Debug)]
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    /// Seeds from the operating system's entropy source.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeds with a fixed value, for reproducible runs.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl JitterSource for SeededJitter {
    fn sample(&self, window: DelayWindow) -> Duration {
        let min = duration_micros(window.min);
        let max = duration_micros(window.max);
        // Checked after truncation: distinct bounds can share a microsecond.
        if min >= max {
            return window.min;
        }
        let micros = match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(min..max),
            Err(poisoned) => poisoned.into_inner().gen_range(min..max),
        };
        Duration::from_micros(micros).max(window.min)
    }
}

/// Always returns the same delay, clamped into the window.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub Duration);

impl JitterSource for FixedJitter {
    fn sample(&self, window: DelayWindow) -> Duration {
        self.0.clamp(window.min, window.max)
    }
}

fn duration_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Outcome of a politeness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// The full delay elapsed.
    Elapsed,
    /// Cancellation fired first.
    Cancelled,
}

/// Random politeness delay shared by all workers.
///
/// Cheap to clone; clones share the jitter source.
#[derive(Clone)]
pub struct RateGovernor {
    window: DelayWindow,
    source: Arc<dyn JitterSource>,
}

impl std::fmt::Debug for RateGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGovernor")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl RateGovernor {
    /// Creates a governor with an explicit jitter source.
    #[must_use]
    pub fn new(window: DelayWindow, source: Arc<dyn JitterSource>) -> Self {
        Self { window, source }
    }

    /// Creates a governor seeded once from OS entropy.
    #[must_use]
    pub fn seeded(window: DelayWindow) -> Self {
        Self::new(window, Arc::new(SeededJitter::from_entropy()))
    }

    /// A governor that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(DelayWindow::none(), Arc::new(FixedJitter(Duration::ZERO)))
    }

    /// The configured window.
    #[must_use]
    pub fn window(&self) -> DelayWindow {
        self.window
    }

    /// Draws the next delay without waiting.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        self.source.sample(self.window)
    }

    /// Waits a random duration inside the window unless cancelled first.
    pub async fn pause(&self, cancel: &CancellationToken) -> Pause {
        if cancel.is_cancelled() {
            return Pause::Cancelled;
        }
        let delay = self.next_delay();
        if delay.is_zero() {
            return Pause::Elapsed;
        }
        trace!(delay_ms = delay.as_millis(), "politeness delay");
        tokio::select! {
            biased;
            () = cancel.cancelled() => Pause::Cancelled,
            () = tokio::time::sleep(delay) => Pause::Elapsed,
        }
    }
}
