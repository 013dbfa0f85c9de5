//! Network faults: server errors, refused connections, timeouts and missing
//! media. Every failure stays local to its item.

use std::fs;
use std::net::TcpListener;
use std::time::Duration;

use ptt_spider::governor::RateGovernor;
use ptt_spider::pipeline::Source;
use ptt_spider::transport::ClientOptions;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::support::forum::{
    BOARD, article, board_index, client_options, crawler, listing, mount_bytes, mount_html,
};
use crate::support::socket_guard::{should_skip_socket_bound_test, start_mock_server_or_skip};

fn board_source() -> Source {
    Source::Board {
        board: BOARD.to_string(),
        pages: 1,
        threshold: 0,
    }
}

async fn mount_single_listing(server: &wiremock::MockServer, rows: &[(&str, &str, &str)]) {
    mount_html(server, &format!("/bbs/{BOARD}/index.html"), board_index(0)).await;
    mount_html(server, &format!("/bbs/{BOARD}/index1.html"), listing(rows)).await;
}

#[tokio::test]
async fn p0_document_server_error_does_not_block_others() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    mount_single_listing(
        &server,
        &[
            ("20", "[正妹] 壞掉", "/bbs/Beauty/M.bad.html"),
            ("30", "[正妹] 正常", "/bbs/Beauty/M.good.html"),
        ],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/bbs/Beauty/M.bad.html"))
        .respond_with(ResponseTemplate::new(500).set_body_bytes(b"error".to_vec()))
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/bbs/Beauty/M.good.html",
        article("[正妹] 正常", &[format!("{base}/img/good.jpg")]),
    )
    .await;
    mount_bytes(&server, "/img/good.jpg", b"good").await;

    let out = TempDir::new().expect("temp dir");
    let root = out.path().join(BOARD);
    let report = crawler(&base, &root, &client_options(), RateGovernor::disabled())
        .run(&board_source(), CancellationToken::new())
        .await;

    assert_eq!(report.stats.documents_failed, 1);
    assert_eq!(report.stats.documents_processed, 1);
    assert_eq!(fs::read(root.join("[正妹] 正常_30").join("good.jpg")).unwrap(), b"good");
    assert!(!root.join("[正妹] 壞掉_20").exists());
}

#[tokio::test]
async fn p0_connection_refused_ends_run_cleanly() {
    if should_skip_socket_bound_test() {
        return;
    }
    // Reserve a port, then release it so nothing is listening.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let base = format!("http://127.0.0.1:{port}");

    let out = TempDir::new().expect("temp dir");
    let root = out.path().join(BOARD);
    let report = crawler(&base, &root, &client_options(), RateGovernor::disabled())
        .run(&board_source(), CancellationToken::new())
        .await;

    assert!(!report.cancelled);
    assert_eq!(report.stats.documents_discovered, 0);
    assert!(!root.exists());
}

#[tokio::test]
async fn p0_media_timeout_skips_item_and_still_writes_summary() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    mount_single_listing(&server, &[("15", "[正妹] 慢圖", "/bbs/Beauty/M.slow.html")]).await;
    mount_html(
        &server,
        "/bbs/Beauty/M.slow.html",
        article(
            "[正妹] 慢圖",
            &[format!("{base}/img/slow.jpg"), format!("{base}/img/fast.jpg")],
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/img/slow.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_bytes(&server, "/img/fast.jpg", b"fast").await;

    let options = ClientOptions {
        timeout: Duration::from_millis(500),
        ..client_options()
    };
    let out = TempDir::new().expect("temp dir");
    let root = out.path().join(BOARD);
    let report = crawler(&base, &root, &options, RateGovernor::disabled())
        .run(&board_source(), CancellationToken::new())
        .await;

    let dir = root.join("[正妹] 慢圖_15");
    assert_eq!(report.stats.media_failed, 1);
    assert_eq!(report.stats.media_downloaded, 1);
    assert!(!dir.join("slow.jpg").exists());
    assert_eq!(fs::read(dir.join("fast.jpg")).unwrap(), b"fast");
    // The summary lists every resource, downloaded or not.
    let readme = fs::read_to_string(dir.join("README.md")).unwrap();
    assert!(readme.contains("![slow.jpg](./slow.jpg)"));
}

#[tokio::test]
async fn p0_missing_media_is_skipped() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    mount_single_listing(&server, &[("12", "[正妹] 缺圖", "/bbs/Beauty/M.gone.html")]).await;
    mount_html(
        &server,
        "/bbs/Beauty/M.gone.html",
        article(
            "[正妹] 缺圖",
            &[format!("{base}/img/gone.jpg"), format!("{base}/img/here.jpg")],
        ),
    )
    .await;
    mount_bytes(&server, "/img/here.jpg", b"here").await;

    let out = TempDir::new().expect("temp dir");
    let root = out.path().join(BOARD);
    let report = crawler(&base, &root, &client_options(), RateGovernor::disabled())
        .run(&board_source(), CancellationToken::new())
        .await;

    let dir = root.join("[正妹] 缺圖_12");
    assert_eq!(report.stats.media_failed, 1);
    assert!(!dir.join("gone.jpg").exists());
    assert!(dir.join("here.jpg").exists());
    assert_eq!(report.stats.summaries_rendered, 1);
}
