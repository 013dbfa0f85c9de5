//! Work discovery: paginated board walk or a fixed list of URLs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::queue::{Dispatch, send_or_cancel};
use super::stats::RunStats;
use crate::error::ErrorKind;
use crate::extract::{ExtractError, Extractor};
use crate::transport::Transport;
use crate::types::WorkItem;

/// Output root used in fixed-list mode, where no board name is known.
pub const FIXED_LIST_ROOT: &str = "articles";

/// Where work items come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Walk the newest `pages` listing pages of `board`, keeping items whose
    /// popularity is at least `threshold`.
    Board {
        board: String,
        pages: u32,
        threshold: i32,
    },
    /// Read newline-delimited document URLs from a file.
    FixedList { path: PathBuf },
}

impl Source {
    /// Returns `true` in fixed-list mode.
    #[must_use]
    pub fn is_fixed_list(&self) -> bool {
        matches!(self, Self::FixedList { .. })
    }

    /// Directory under `output_dir` that receives every document directory.
    #[must_use]
    pub fn output_root(&self, output_dir: &Path) -> PathBuf {
        match self {
            Self::Board { board, .. } => output_dir.join(board),
            Self::FixedList { .. } => output_dir.join(FIXED_LIST_ROOT),
        }
    }
}

/// Failures that stop enumeration.
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// The highest listing page could not be determined.
    #[error("could not determine highest page of board {board}: {source}")]
    HighestPage {
        /// Board being enumerated.
        board: String,
        /// The underlying failure.
        #[source]
        source: ExtractError,
    },

    /// The URL list could not be read.
    #[error("failed to read URL list {path}: {source}")]
    ReadList {
        /// The list file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl EnumerationError {
    /// Returns the failure kind. Always [`ErrorKind::Enumeration`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Enumeration
    }
}

/// URL of listing page `page` of `board`.
#[must_use]
pub fn listing_page_url(base_url: &str, board: &str, page: u32) -> String {
    format!("{}/bbs/{board}/index{page}.html", base_url.trim_end_matches('/'))
}

pub(crate) struct Enumerator {
    transport: Arc<dyn Transport>,
    extractor: Arc<dyn Extractor>,
    base_url: String,
    stats: Arc<RunStats>,
}

impl Enumerator {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        extractor: Arc<dyn Extractor>,
        base_url: impl Into<String>,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            transport,
            extractor,
            base_url: base_url.into(),
            stats,
        }
    }

    /// Emits work items until the source is exhausted or `cancel` fires.
    ///
    /// `sender` is consumed, so the document channel closes when this returns
    /// on every path. Returns the number of items emitted.
    pub(crate) async fn run(
        &self,
        source: &Source,
        sender: mpsc::Sender<WorkItem>,
        cancel: &CancellationToken,
    ) -> Result<usize, EnumerationError> {
        if cancel.is_cancelled() {
            return Ok(0);
        }
        match source {
            Source::Board {
                board,
                pages,
                threshold,
            } => self.walk_board(board, *pages, *threshold, &sender, cancel).await,
            Source::FixedList { path } => self.read_list(path, &sender, cancel).await,
        }
    }

    #[instrument(skip(self, sender, cancel))]
    async fn walk_board(
        &self,
        board: &str,
        pages: u32,
        threshold: i32,
        sender: &mpsc::Sender<WorkItem>,
        cancel: &CancellationToken,
    ) -> Result<usize, EnumerationError> {
        let highest = self
            .extractor
            .highest_page_number(self.transport.as_ref(), board)
            .await
            .map_err(|source| EnumerationError::HighestPage {
                board: board.to_string(),
                source,
            })?;
        info!(board, highest, pages, threshold, "enumerating listing pages");

        let mut emitted = 0;
        for offset in 0..pages {
            if cancel.is_cancelled() {
                debug!("enumeration cancelled");
                break;
            }
            let Some(page) = highest.checked_sub(offset).filter(|p| *p >= 1) else {
                debug!(offset, "reached the first listing page");
                break;
            };

            let url = listing_page_url(&self.base_url, board, page);
            let items = match self.fetch_listing(&url).await {
                Ok(items) => items,
                Err(error) => {
                    warn!(url = %url, kind = %error.kind(), error = %error, "skipping listing page");
                    continue;
                }
            };
            debug!(page, found = items.len(), "listing page enumerated");

            for item in items.into_iter().filter(|i| i.popularity >= threshold) {
                if !self.emit(item, sender, cancel).await {
                    return Ok(emitted);
                }
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    async fn fetch_listing(&self, url: &str) -> Result<Vec<WorkItem>, ExtractError> {
        let body = self.transport.get(url).await?.error_for_status()?.text().await?;
        self.extractor.extract_listing(&body)
    }

    #[instrument(skip(self, sender, cancel), fields(path = %path.display()))]
    async fn read_list(
        &self,
        path: &Path,
        sender: &mpsc::Sender<WorkItem>,
        cancel: &CancellationToken,
    ) -> Result<usize, EnumerationError> {
        let read_error = |source| EnumerationError::ReadList {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(read_error)?;
        let mut lines = BufReader::new(file).lines();
        let prefix = format!("{}/bbs/", self.base_url.trim_end_matches('/'));

        let mut emitted = 0;
        loop {
            let line = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("enumeration cancelled");
                    break;
                }
                line = lines.next_line() => line.map_err(read_error)?,
            };
            let Some(line) = line else {
                break;
            };

            let url = line.trim();
            if !url.starts_with(&prefix) {
                continue;
            }
            if !self.emit(WorkItem::from_url(url), sender, cancel).await {
                break;
            }
            emitted += 1;
        }
        info!(emitted, "URL list enumerated");
        Ok(emitted)
    }

    /// Returns `false` when enumeration must stop.
    async fn emit(
        &self,
        item: WorkItem,
        sender: &mpsc::Sender<WorkItem>,
        cancel: &CancellationToken,
    ) -> bool {
        let url = item.source_url.clone();
        let popularity = item.popularity;
        match send_or_cancel(sender, item, cancel).await {
            Dispatch::Sent => {
                self.stats.increment_discovered();
                info!(url = %url, popularity, "document discovered");
                true
            }
            Dispatch::Cancelled => {
                debug!("enumeration cancelled while sending");
                false
            }
            Dispatch::Closed => {
                warn!("document channel closed, stopping enumeration");
                self.stats.increment_channel_faults();
                false
            }
        }
    }
}
