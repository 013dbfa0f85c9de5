//! Markdown summary renderer.

use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{RenderError, Renderer};
use crate::naming::media_filename;
use crate::types::SummaryTask;

/// Name of the summary file written into every document directory.
pub const SUMMARY_FILE_NAME: &str = "README.md";

/// Formats the summary for `task`.
///
/// Images are referenced by the same filename the media workers write, so
/// the file renders correctly once downloads finish.
#[must_use]
pub fn render_markdown(task: &SummaryTask) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", task.title);
    out.push('\n');
    let _ = writeln!(out, "- Source: [{0}]({0})", task.source_url);
    let _ = writeln!(out, "- Popularity: {}", task.popularity);
    let _ = writeln!(out, "- Images: {}", task.resource_urls.len());
    out.push('\n');
    out.push_str("## Images\n\n");
    for url in &task.resource_urls {
        let name = media_filename(url);
        let _ = writeln!(out, "![{name}](./{name})");
    }
    out
}

/// Writes `README.md` summaries with tokio's filesystem API.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    /// Creates a renderer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Renderer for MarkdownRenderer {
    #[instrument(skip(self, task), fields(dir = %task.destination_dir.display()))]
    async fn render(&self, task: &SummaryTask) -> Result<PathBuf, RenderError> {
        tokio::fs::create_dir_all(&task.destination_dir)
            .await
            .map_err(|source| RenderError::CreateDir {
                path: task.destination_dir.clone(),
                source,
            })?;

        let path = task.destination_dir.join(SUMMARY_FILE_NAME);
        tokio::fs::write(&path, render_markdown(task))
            .await
            .map_err(|source| RenderError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "summary written");
        Ok(path)
    }
}
