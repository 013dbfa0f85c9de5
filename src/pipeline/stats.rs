//! Per-run counters updated concurrently by every stage.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Statistics from one crawl.
///
/// Uses atomic counters so workers in every pool can update them without
/// locking.
#[derive(Debug, Default)]
pub struct RunStats {
    documents_discovered: AtomicUsize,
    documents_processed: AtomicUsize,
    documents_without_media: AtomicUsize,
    documents_failed: AtomicUsize,
    media_dispatched: AtomicUsize,
    media_downloaded: AtomicUsize,
    media_failed: AtomicUsize,
    summaries_rendered: AtomicUsize,
    summaries_failed: AtomicUsize,
    channel_faults: AtomicUsize,
}

/// Point-in-time copy of [`RunStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Work items emitted by the enumerator.
    pub documents_discovered: usize,
    /// Documents whose media and summary tasks were all dispatched.
    pub documents_processed: usize,
    /// Documents fetched and extracted but carrying no resources.
    pub documents_without_media: usize,
    /// Documents abandoned on a fetch or extraction failure.
    pub documents_failed: usize,
    /// Media tasks handed to the media pool.
    pub media_dispatched: usize,
    /// Media files written to disk.
    pub media_downloaded: usize,
    /// Media tasks abandoned.
    pub media_failed: usize,
    /// Summary files written.
    pub summaries_rendered: usize,
    /// Summary renders that failed.
    pub summaries_failed: usize,
    /// Sends that found the downstream stage already closed.
    pub channel_faults: usize,
}

impl RunStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every counter.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            documents_discovered: load(&self.documents_discovered),
            documents_processed: load(&self.documents_processed),
            documents_without_media: load(&self.documents_without_media),
            documents_failed: load(&self.documents_failed),
            media_dispatched: load(&self.media_dispatched),
            media_downloaded: load(&self.media_downloaded),
            media_failed: load(&self.media_failed),
            summaries_rendered: load(&self.summaries_rendered),
            summaries_failed: load(&self.summaries_failed),
            channel_faults: load(&self.channel_faults),
        }
    }

    pub(crate) fn increment_discovered(&self) {
        self.documents_discovered.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_processed(&self) {
        self.documents_processed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_without_media(&self) {
        self.documents_without_media.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_documents_failed(&self) {
        self.documents_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn add_media_dispatched(&self, count: usize) {
        self.media_dispatched.fetch_add(count, Ordering::SeqCst);
    }

    pub(crate) fn increment_media_downloaded(&self) {
        self.media_downloaded.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_media_failed(&self) {
        self.media_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_summaries_rendered(&self) {
        self.summaries_rendered.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_summaries_failed(&self) {
        self.summaries_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_channel_faults(&self) {
        self.channel_faults.fetch_add(1, Ordering::SeqCst);
    }
}

fn load(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
