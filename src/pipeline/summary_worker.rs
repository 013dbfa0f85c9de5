//! The single summary worker.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::queue::{Next, SharedReceiver};
use super::stats::RunStats;
use crate::render::Renderer;
use crate::types::SummaryTask;

/// Renders summary tasks one at a time until the channel drains or the run
/// is cancelled. Render failures are logged and skipped.
pub(crate) async fn run_summary_worker(
    renderer: Arc<dyn Renderer>,
    queue: SharedReceiver<SummaryTask>,
    stats: Arc<RunStats>,
    cancel: CancellationToken,
) {
    debug!("summary worker started");
    loop {
        let task = match queue.recv_or_cancel(&cancel).await {
            Next::Task(task) => task,
            Next::Closed => break,
            Next::Cancelled => {
                debug!("summary worker cancelled");
                break;
            }
        };

        match renderer.render(&task).await {
            Ok(path) => {
                stats.increment_summaries_rendered();
                info!(path = %path.display(), images = task.resource_urls.len(), "summary rendered");
            }
            Err(error) => {
                stats.increment_summaries_failed();
                warn!(
                    url = %task.source_url,
                    dir = %task.destination_dir.display(),
                    kind = %error.kind(),
                    error = %error,
                    "summary render failed"
                );
            }
        }
    }
    debug!("summary worker finished");
}
