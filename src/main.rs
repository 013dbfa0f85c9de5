//! CLI entry point for ptt-spider.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ptt_spider::config::load_config;
use ptt_spider::extract::PttExtractor;
use ptt_spider::governor::RateGovernor;
use ptt_spider::pipeline::Crawler;
use ptt_spider::render::MarkdownRenderer;
use ptt_spider::transport::{HttpClient, consent_cookie_jar};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;
mod logging;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let no_color = logging::should_disable_color(
        args.no_color,
        logging::no_color_env_requested(),
        logging::is_dumb_terminal(),
    );
    logging::init_tracing(args.log_level(), args.forces_log_level(), no_color);
    debug!(?args, "CLI arguments parsed");

    let loaded = load_config(&args.config)?;
    let config = loaded.config;
    debug!(path = %loaded.path.display(), from_file = loaded.loaded_from_file, "effective config");

    let source = args.source();
    let settings = config.crawler_settings(source.output_root(&args.output_dir));

    let jar = consent_cookie_jar(&settings.base_url).context("Invalid `crawler.base_url`")?;
    let client = HttpClient::new(&config.client_options(), Some(jar))
        .context("Failed to build HTTP client")?;
    let governor = RateGovernor::seeded(config.delay_window()?);
    let extractor = PttExtractor::new(settings.base_url.clone());

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    info!(source = ?source, output = %settings.output_root.display(), "ptt-spider starting");
    let crawler = Crawler::new(
        settings,
        Arc::new(client),
        Arc::new(extractor),
        Arc::new(MarkdownRenderer::new()),
        governor,
    );
    let report = crawler.run(&source, cancel).await;

    if report.cancelled {
        info!("interrupted; files written so far are kept");
    }
    Ok(())
}

/// Cancels `cancel` on the first Ctrl+C or, on Unix, SIGTERM.
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if wait_for_shutdown_signal().await {
            warn!("shutdown signal received, stopping crawl");
            cancel.cancel();
        }
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> bool {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler");
            return tokio::signal::ctrl_c().await.is_ok();
        }
    };
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.is_ok(),
        _ = terminate.recv() => true,
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> bool {
    tokio::signal::ctrl_c().await.is_ok()
}
