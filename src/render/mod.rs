//! Summary file rendering.

mod markdown;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

pub use markdown::{MarkdownRenderer, SUMMARY_FILE_NAME, render_markdown};

use crate::error::ErrorKind;
use crate::types::SummaryTask;

/// Errors raised while writing a summary file.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The destination directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The summary file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File that could not be written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    /// Returns the failure kind. Always [`ErrorKind::LocalIo`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::LocalIo
    }
}

/// Writes the summary file for one document.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders `task` into its destination directory, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] on any local IO failure.
    async fn render(&self, task: &SummaryTask) -> Result<PathBuf, RenderError>;
}
