//! Work units flowing between pipeline stages.

use std::path::PathBuf;

/// Popularity reported for posts the board marks as exceptional ("爆").
pub const EXCEPTIONAL_POPULARITY: i32 = 100;

/// Popularity reported for posts with the lowest possible score ("XX").
pub const FLOOR_POPULARITY: i32 = -100;

/// A discovered reference to one source document.
///
/// Created by the enumerator and never modified downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Title from the listing page; empty in fixed-list mode.
    pub title: String,
    /// Absolute URL of the document. Stable identity of the item.
    pub source_url: String,
    /// Push count. Positive is favorable, negative unfavorable.
    pub popularity: i32,
    /// Author handle from the listing page, informational only.
    pub author: String,
}

impl WorkItem {
    /// Creates a work item for a URL read from a fixed list.
    ///
    /// The title is unknown until the document is fetched.
    #[must_use]
    pub fn from_url(source_url: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            source_url: source_url.into(),
            popularity: 0,
            author: String::new(),
        }
    }
}

/// One binary resource to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTask {
    /// URL of the resource.
    pub resource_url: String,
    /// Full path of the file to write, inside the document directory.
    pub destination_path: PathBuf,
}

/// Everything the renderer needs to write one summary file.
///
/// Only produced for documents with at least one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryTask {
    pub title: String,
    pub source_url: String,
    pub popularity: i32,
    /// Resource URLs in extraction order.
    pub resource_urls: Vec<String>,
    pub destination_dir: PathBuf,
}

/// Structured data recovered from a fetched document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Title found in the article header, empty when absent.
    pub title: String,
    /// Resource links in document order.
    pub resource_urls: Vec<String>,
}
