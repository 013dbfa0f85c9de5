//! Document workers: fetch, extract, then fan out media and summary tasks.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::queue::{Dispatch, Next, SharedReceiver, send_or_cancel};
use super::stats::RunStats;
use crate::error::ErrorKind;
use crate::extract::Extractor;
use crate::governor::{Pause, RateGovernor};
use crate::naming::{directory_name, media_filename};
use crate::transport::{FetchError, Transport};
use crate::types::{MediaTask, SummaryTask, WorkItem};

/// What happened to one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocumentOutcome {
    /// All media tasks and the summary task were sent.
    Dispatched { media: usize },
    /// The document carried no resources; nothing was sent.
    NoResources,
    FetchFailed(ErrorKind),
    ExtractFailed,
    Cancelled,
    /// A downstream channel was closed while sending.
    ChannelClosed,
}

/// Everything a document worker needs, shared by the whole pool.
pub(crate) struct DocumentContext {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) extractor: Arc<dyn Extractor>,
    pub(crate) governor: RateGovernor,
    pub(crate) output_root: PathBuf,
    /// Fixed-list mode: the title recovered from the document wins.
    pub(crate) prefer_document_title: bool,
    pub(crate) stats: Arc<RunStats>,
    pub(crate) media: mpsc::Sender<MediaTask>,
    pub(crate) summaries: mpsc::Sender<SummaryTask>,
}

/// Picks the title used for the document directory.
///
/// In fixed-list mode a non-empty document title always wins. Otherwise the
/// listing title is kept unless it is empty.
pub(crate) fn resolve_title(
    listing_title: &str,
    document_title: &str,
    prefer_document_title: bool,
) -> String {
    let use_document = !document_title.is_empty()
        && (prefer_document_title || listing_title.is_empty());
    if use_document {
        document_title.to_string()
    } else {
        listing_title.to_string()
    }
}

async fn fetch_text(transport: &dyn Transport, url: &str) -> Result<String, FetchError> {
    transport.get(url).await?.error_for_status()?.text().await
}

pub(crate) async fn process_document(
    ctx: &DocumentContext,
    item: WorkItem,
    cancel: &CancellationToken,
) -> DocumentOutcome {
    if ctx.governor.pause(cancel).await == Pause::Cancelled {
        return DocumentOutcome::Cancelled;
    }

    let body = match fetch_text(ctx.transport.as_ref(), &item.source_url).await {
        Ok(body) => body,
        Err(error) => {
            warn!(url = %item.source_url, kind = %error.kind(), error = %error, "document fetch failed");
            return DocumentOutcome::FetchFailed(error.kind());
        }
    };

    let document = match ctx.extractor.extract_document(&body) {
        Ok(document) => document,
        Err(error) => {
            warn!(url = %item.source_url, kind = %error.kind(), error = %error, "document extraction failed");
            return DocumentOutcome::ExtractFailed;
        }
    };

    let title = resolve_title(&item.title, &document.title, ctx.prefer_document_title);
    if document.resource_urls.is_empty() {
        info!(url = %item.source_url, title = %title, "document has no media, skipping");
        return DocumentOutcome::NoResources;
    }

    let destination_dir = ctx.output_root.join(directory_name(&title, item.popularity));

    for resource_url in &document.resource_urls {
        let task = MediaTask {
            resource_url: resource_url.clone(),
            destination_path: destination_dir.join(media_filename(resource_url)),
        };
        match send_or_cancel(&ctx.media, task, cancel).await {
            Dispatch::Sent => {}
            Dispatch::Cancelled => return DocumentOutcome::Cancelled,
            Dispatch::Closed => return DocumentOutcome::ChannelClosed,
        }
    }

    let media = document.resource_urls.len();
    let summary = SummaryTask {
        title,
        source_url: item.source_url,
        popularity: item.popularity,
        resource_urls: document.resource_urls,
        destination_dir,
    };
    match send_or_cancel(&ctx.summaries, summary, cancel).await {
        Dispatch::Sent => DocumentOutcome::Dispatched { media },
        Dispatch::Cancelled => DocumentOutcome::Cancelled,
        Dispatch::Closed => DocumentOutcome::ChannelClosed,
    }
}

pub(crate) async fn run_document_worker(
    id: usize,
    ctx: Arc<DocumentContext>,
    queue: SharedReceiver<WorkItem>,
    cancel: CancellationToken,
) {
    debug!(worker = id, "document worker started");
    loop {
        let item = match queue.recv_or_cancel(&cancel).await {
            Next::Task(item) => item,
            Next::Closed => break,
            Next::Cancelled => {
                debug!(worker = id, "document worker cancelled");
                break;
            }
        };

        let url = item.source_url.clone();
        match process_document(&ctx, item, &cancel).await {
            DocumentOutcome::Dispatched { media } => {
                ctx.stats.increment_processed();
                ctx.stats.add_media_dispatched(media);
                info!(worker = id, url = %url, media, "document processed");
            }
            DocumentOutcome::NoResources => ctx.stats.increment_without_media(),
            DocumentOutcome::FetchFailed(_) | DocumentOutcome::ExtractFailed => {
                ctx.stats.increment_documents_failed();
            }
            DocumentOutcome::Cancelled => {
                debug!(worker = id, url = %url, "document abandoned on cancellation");
                break;
            }
            DocumentOutcome::ChannelClosed => {
                ctx.stats.increment_channel_faults();
                warn!(worker = id, url = %url, "downstream channel closed before document workers finished");
                break;
            }
        }
    }
    debug!(worker = id, "document worker finished");
}
