//! Structured-data extraction from fetched pages.
//!
//! The pipeline depends only on the [`Extractor`] trait; [`PttExtractor`]
//! is the HTML implementation for the forum.

mod ptt;

use async_trait::async_trait;
use thiserror::Error;

pub use ptt::PttExtractor;

use crate::error::ErrorKind;
use crate::transport::{FetchError, Transport};
use crate::types::{ExtractedDocument, WorkItem};

/// Errors raised while extracting structured data.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The fetched body was empty.
    #[error("document body is empty")]
    EmptyBody,

    /// A required element was not found.
    #[error("missing element matching `{selector}`")]
    MissingElement {
        /// The CSS selector or description of what was expected.
        selector: &'static str,
    },

    /// A paging link did not carry a usable page number.
    #[error("no page number in link `{href}`")]
    InvalidPageNumber {
        /// The offending href.
        href: String,
    },

    /// Fetching the page to extract from failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ExtractError {
    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch(e) => e.kind(),
            _ => ErrorKind::Extraction,
        }
    }
}

/// Extraction capability consumed by the enumerator and document workers.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extracts the work items listed on one listing page.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the body is not a listing page.
    fn extract_listing(&self, body: &str) -> Result<Vec<WorkItem>, ExtractError>;

    /// Extracts the title and resource links of one document.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the body is not a document page.
    fn extract_document(&self, body: &str) -> Result<ExtractedDocument, ExtractError>;

    /// Determines the highest listing page number of `board`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the listing root cannot be fetched or
    /// carries no usable paging link.
    async fn highest_page_number(
        &self,
        transport: &dyn Transport,
        board: &str,
    ) -> Result<u32, ExtractError>;
}
