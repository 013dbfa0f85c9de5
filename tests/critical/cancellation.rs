//! Cancellation stops every stage promptly and keeps finished files.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ptt_spider::governor::{DelayWindow, FixedJitter, RateGovernor};
use ptt_spider::pipeline::Source;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::support::forum::{
    BOARD, article, board_index, client_options, crawler, listing, mount_bytes, mount_html,
};
use crate::support::socket_guard::start_mock_server_or_skip;

fn slow_governor() -> RateGovernor {
    let delay = Duration::from_secs(90);
    RateGovernor::new(
        DelayWindow::new(delay, delay).expect("window"),
        Arc::new(FixedJitter(delay)),
    )
}

async fn mount_board(server: &wiremock::MockServer) {
    let base = server.uri();
    mount_html(server, &format!("/bbs/{BOARD}/index.html"), board_index(0)).await;
    mount_html(
        server,
        &format!("/bbs/{BOARD}/index1.html"),
        listing(&[
            ("50", "[正妹] 1", "/bbs/Beauty/M.1.html"),
            ("60", "[正妹] 2", "/bbs/Beauty/M.2.html"),
        ]),
    )
    .await;
    for n in 1..=2 {
        mount_html(
            server,
            &format!("/bbs/Beauty/M.{n}.html"),
            article(&format!("[正妹] {n}"), &[format!("{base}/img/{n}.jpg")]),
        )
        .await;
        mount_bytes(server, &format!("/img/{n}.jpg"), b"img").await;
    }
}

fn board_source() -> Source {
    Source::Board {
        board: BOARD.to_string(),
        pages: 1,
        threshold: 0,
    }
}

#[tokio::test]
async fn p0_cancel_during_politeness_delay_returns_promptly() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_board(&server).await;

    let out = TempDir::new().expect("temp dir");
    let root = out.path().join(BOARD);
    let crawler = crawler(&server.uri(), &root, &client_options(), slow_governor());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let report = crawler.run(&board_source(), cancel).await;

    assert!(
        started.elapsed() < Duration::from_secs(5),
        "run took {:?} after cancellation",
        started.elapsed()
    );
    assert!(report.cancelled);
    assert_eq!(report.stats.documents_processed, 0);
    assert_eq!(report.stats.media_downloaded, 0);

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(
        requests.iter().all(|r| !r.url.path().starts_with("/img/")),
        "no media may be fetched after cancellation"
    );
}

#[tokio::test]
async fn p0_pre_cancelled_run_sends_no_requests() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_board(&server).await;

    let out = TempDir::new().expect("temp dir");
    let root = out.path().join(BOARD);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = crawler(&server.uri(), &root, &client_options(), RateGovernor::disabled())
        .run(&board_source(), cancel)
        .await;

    assert!(report.cancelled);
    assert_eq!(report.stats.documents_discovered, 0);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    assert!(!root.exists());
}

#[tokio::test]
async fn p0_cancel_after_completion_keeps_written_files() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_board(&server).await;

    let out = TempDir::new().expect("temp dir");
    let root = out.path().join(BOARD);
    let cancel = CancellationToken::new();

    let report = crawler(&server.uri(), &root, &client_options(), RateGovernor::disabled())
        .run(&board_source(), cancel.clone())
        .await;
    cancel.cancel();

    assert!(!report.cancelled);
    assert_eq!(report.stats.media_downloaded, 2);
    assert!(root.join("[正妹] 1_50").join("1.jpg").exists());
    assert!(root.join("[正妹] 2_60").join("2.jpg").exists());
}
