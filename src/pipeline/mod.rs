//! Crawl orchestration.
//!
//! A run wires five stages together with bounded channels:
//!
//! ```text
//! Enumerator -> documents -> Document workers (N) -+-> media     -> Media workers (M)
//!                                                  +-> summaries -> Summary worker (1)
//! ```
//!
//! # Lifecycle
//!
//! - The enumerator owns the only document sender and drops it when it
//!   returns, so the document channel closes on every exit path.
//! - The media and summary senders are held by a closer task that waits for
//!   the whole document pool to finish before dropping them. Downstream
//!   workers therefore never see a closed channel while a document worker
//!   can still send.
//! - Every receive, send and politeness wait races the run's
//!   [`CancellationToken`]. In-flight network calls are bounded by the
//!   transport timeout only.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ptt_spider::extract::PttExtractor;
//! use ptt_spider::governor::RateGovernor;
//! use ptt_spider::pipeline::{Crawler, CrawlerSettings, Source};
//! use ptt_spider::render::MarkdownRenderer;
//! use ptt_spider::transport::{ClientOptions, HttpClient, PTT_BASE_URL, consent_cookie_jar};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(&ClientOptions::default(), Some(consent_cookie_jar(PTT_BASE_URL)?))?;
//! let source = Source::Board { board: "Beauty".into(), pages: 3, threshold: 10 };
//! let settings = CrawlerSettings::new(source.output_root(std::path::Path::new(".")));
//! let crawler = Crawler::new(
//!     settings,
//!     Arc::new(client),
//!     Arc::new(PttExtractor::default()),
//!     Arc::new(MarkdownRenderer::new()),
//!     RateGovernor::disabled(),
//! );
//! let report = crawler.run(&source, CancellationToken::new()).await;
//! println!("downloaded {} images", report.stats.media_downloaded);
//! # Ok(())
//! # }
//! ```

mod document_worker;
mod enumerator;
mod media_worker;
mod queue;
mod stats;
mod summary_worker;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

pub use enumerator::{EnumerationError, FIXED_LIST_ROOT, Source, listing_page_url};
pub use media_worker::{MediaError, download_media};
pub use stats::{RunStats, StatsSnapshot};

use document_worker::{DocumentContext, run_document_worker};
use enumerator::Enumerator;
use media_worker::{MediaContext, run_media_worker};
use queue::SharedReceiver;
use summary_worker::run_summary_worker;

use crate::extract::Extractor;
use crate::governor::RateGovernor;
use crate::render::Renderer;
use crate::transport::{PTT_BASE_URL, Transport};

/// Default number of document workers.
pub const DEFAULT_DOCUMENT_WORKERS: usize = 10;

/// Default number of media workers.
pub const DEFAULT_MEDIA_WORKERS: usize = 10;

/// Default document channel capacity.
pub const DEFAULT_DOCUMENT_BUFFER: usize = 100;

/// Default media channel capacity.
pub const DEFAULT_MEDIA_BUFFER: usize = 200;

/// Default summary channel capacity.
pub const DEFAULT_SUMMARY_BUFFER: usize = 100;

/// Pool sizes, channel capacities and output location of a run.
///
/// Zero sizes are raised to one when the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerSettings {
    pub document_workers: usize,
    pub media_workers: usize,
    pub document_buffer: usize,
    pub media_buffer: usize,
    pub summary_buffer: usize,
    /// Origin used to build listing URLs and to recognise fixed-list lines.
    pub base_url: String,
    /// Directory that receives one sub-directory per document.
    pub output_root: PathBuf,
}

impl CrawlerSettings {
    /// Default sizes writing under `output_root`.
    #[must_use]
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            document_workers: DEFAULT_DOCUMENT_WORKERS,
            media_workers: DEFAULT_MEDIA_WORKERS,
            document_buffer: DEFAULT_DOCUMENT_BUFFER,
            media_buffer: DEFAULT_MEDIA_BUFFER,
            summary_buffer: DEFAULT_SUMMARY_BUFFER,
            base_url: PTT_BASE_URL.to_string(),
            output_root: output_root.into(),
        }
    }
}

/// Outcome of [`Crawler::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// Whether the run ended because of cancellation.
    pub cancelled: bool,
    /// Final counters.
    pub stats: StatsSnapshot,
}

/// Runs the crawl pipeline.
pub struct Crawler {
    settings: CrawlerSettings,
    transport: Arc<dyn Transport>,
    extractor: Arc<dyn Extractor>,
    renderer: Arc<dyn Renderer>,
    governor: RateGovernor,
}

impl Crawler {
    /// Creates a crawler from its collaborators.
    #[must_use]
    pub fn new(
        settings: CrawlerSettings,
        transport: Arc<dyn Transport>,
        extractor: Arc<dyn Extractor>,
        renderer: Arc<dyn Renderer>,
        governor: RateGovernor,
    ) -> Self {
        Self {
            settings,
            transport,
            extractor,
            renderer,
            governor,
        }
    }

    /// The run settings.
    #[must_use]
    pub fn settings(&self) -> &CrawlerSettings {
        &self.settings
    }

    /// Crawls `source` until every stage drains or `cancel` fires.
    ///
    /// Never fails: per-item errors are logged and counted, and an
    /// enumeration failure only stops discovery.
    #[instrument(skip(self, cancel), fields(output = %self.settings.output_root.display()))]
    pub async fn run(&self, source: &Source, cancel: CancellationToken) -> RunReport {
        let started = Instant::now();
        let stats = Arc::new(RunStats::new());
        let settings = &self.settings;
        let document_workers = settings.document_workers.max(1);
        let media_workers = settings.media_workers.max(1);

        let (document_tx, document_rx) = mpsc::channel(settings.document_buffer.max(1));
        let (media_tx, media_rx) = mpsc::channel(settings.media_buffer.max(1));
        let (summary_tx, summary_rx) = mpsc::channel(settings.summary_buffer.max(1));

        let mut media_pool = JoinSet::new();
        let media_ctx = Arc::new(MediaContext {
            transport: Arc::clone(&self.transport),
            governor: self.governor.clone(),
            stats: Arc::clone(&stats),
        });
        let media_queue = SharedReceiver::new(media_rx);
        for id in 0..media_workers {
            media_pool.spawn(run_media_worker(
                id,
                Arc::clone(&media_ctx),
                media_queue.clone(),
                cancel.clone(),
            ));
        }
        drop(media_ctx);

        let mut summary_pool = JoinSet::new();
        summary_pool.spawn(run_summary_worker(
            Arc::clone(&self.renderer),
            SharedReceiver::new(summary_rx),
            Arc::clone(&stats),
            cancel.clone(),
        ));

        let mut document_pool = JoinSet::new();
        let document_ctx = Arc::new(DocumentContext {
            transport: Arc::clone(&self.transport),
            extractor: Arc::clone(&self.extractor),
            governor: self.governor.clone(),
            output_root: settings.output_root.clone(),
            prefer_document_title: source.is_fixed_list(),
            stats: Arc::clone(&stats),
            media: media_tx.clone(),
            summaries: summary_tx.clone(),
        });
        let document_queue = SharedReceiver::new(document_rx);
        for id in 0..document_workers {
            document_pool.spawn(run_document_worker(
                id,
                Arc::clone(&document_ctx),
                document_queue.clone(),
                cancel.clone(),
            ));
        }
        drop(document_ctx);
        drop(document_queue);
        debug!(document_workers, media_workers, "worker pools started");

        // Downstream channels close only once every document worker is gone.
        let closer = tokio::spawn(async move {
            join_pool(&mut document_pool, "document").await;
            drop(media_tx);
            drop(summary_tx);
        });

        let enumerator = Enumerator::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.extractor),
            settings.base_url.clone(),
            Arc::clone(&stats),
        );
        match enumerator.run(source, document_tx, &cancel).await {
            Ok(emitted) => debug!(emitted, "enumeration finished"),
            Err(e) => error!(kind = %e.kind(), error = %e, "enumeration stopped"),
        }

        if let Err(e) = closer.await {
            warn!(error = %e, "document pool closer panicked");
        }
        join_pool(&mut media_pool, "media").await;
        join_pool(&mut summary_pool, "summary").await;

        let report = RunReport {
            elapsed: started.elapsed(),
            cancelled: cancel.is_cancelled(),
            stats: stats.snapshot(),
        };
        info!(
            elapsed_ms = report.elapsed.as_millis(),
            cancelled = report.cancelled,
            discovered = report.stats.documents_discovered,
            processed = report.stats.documents_processed,
            failed = report.stats.documents_failed,
            media_downloaded = report.stats.media_downloaded,
            media_failed = report.stats.media_failed,
            summaries = report.stats.summaries_rendered,
            "crawl finished"
        );
        report
    }
}

/// Awaits every task of a pool, logging panics instead of propagating them.
async fn join_pool(pool: &mut JoinSet<()>, name: &'static str) {
    while let Some(result) = pool.join_next().await {
        if let Err(e) = result {
            warn!(pool = name, error = %e, "task panicked");
        }
    }
    debug!(pool = name, "pool drained");
}
