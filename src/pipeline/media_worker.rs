//! Media workers: fetch one resource and stream it to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::queue::{Next, SharedReceiver};
use super::stats::RunStats;
use crate::error::ErrorKind;
use crate::governor::{Pause, RateGovernor};
use crate::transport::{FetchError, Transport};
use crate::types::MediaTask;

/// Errors that abandon one media task.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Fetching the resource failed or returned a non-2xx status.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The document directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The destination file could not be created.
    #[error("failed to create file {path}: {source}")]
    CreateFile {
        /// File that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Streaming the body to disk failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl MediaError {
    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch(e) => e.kind(),
            Self::CreateDir { .. } | Self::CreateFile { .. } | Self::Write { .. } => {
                ErrorKind::LocalIo
            }
        }
    }
}

/// Downloads `task` and returns the number of bytes written.
///
/// The parent directory is created if absent; concurrent creation of the
/// same directory by other workers is fine. A failure mid-stream can leave a
/// partial file behind.
///
/// # Errors
///
/// Returns [`MediaError`] on any fetch or local IO failure.
pub async fn download_media(transport: &dyn Transport, task: &MediaTask) -> Result<u64, MediaError> {
    let response = transport.get(&task.resource_url).await?.error_for_status()?;
    let path = task.destination_path.as_path();

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| MediaError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
    }

    let file = tokio::fs::File::create(path)
        .await
        .map_err(|source| MediaError::CreateFile {
            path: path.to_path_buf(),
            source,
        })?;
    let mut writer = BufWriter::new(file);
    let mut body = response.into_body();

    let bytes = tokio::io::copy(&mut body, &mut writer)
        .await
        .map_err(|source| write_error(path, source))?;
    writer.flush().await.map_err(|source| write_error(path, source))?;

    Ok(bytes)
}

fn write_error(path: &Path, source: std::io::Error) -> MediaError {
    MediaError::Write {
        path: path.to_path_buf(),
        source,
    }
}

pub(crate) struct MediaContext {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) governor: RateGovernor,
    pub(crate) stats: Arc<RunStats>,
}

pub(crate) async fn run_media_worker(
    id: usize,
    ctx: Arc<MediaContext>,
    queue: SharedReceiver<MediaTask>,
    cancel: CancellationToken,
) {
    debug!(worker = id, "media worker started");
    loop {
        let task = match queue.recv_or_cancel(&cancel).await {
            Next::Task(task) => task,
            Next::Closed => break,
            Next::Cancelled => {
                debug!(worker = id, "media worker cancelled");
                break;
            }
        };

        if ctx.governor.pause(&cancel).await == Pause::Cancelled {
            debug!(worker = id, url = %task.resource_url, "media task abandoned on cancellation");
            break;
        }

        match download_media(ctx.transport.as_ref(), &task).await {
            Ok(bytes) => {
                ctx.stats.increment_media_downloaded();
                info!(
                    worker = id,
                    url = %task.resource_url,
                    path = %task.destination_path.display(),
                    bytes,
                    "media downloaded"
                );
            }
            Err(MediaError::Fetch(error @ FetchError::RateLimited { .. })) => {
                ctx.stats.increment_media_failed();
                let retry_after_secs = error.retry_after_hint().map(|d| d.as_secs());
                warn!(
                    worker = id,
                    url = %task.resource_url,
                    retry_after_secs = ?retry_after_secs,
                    "rate limited, skipping media"
                );
            }
            Err(error) => {
                ctx.stats.increment_media_failed();
                warn!(
                    worker = id,
                    url = %task.resource_url,
                    path = %task.destination_path.display(),
                    kind = %error.kind(),
                    error = %error,
                    "media skipped"
                );
            }
        }
    }
    debug!(worker = id, "media worker finished");
}
