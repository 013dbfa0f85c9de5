//! HTTP 429 handling: the resource is skipped once, never retried.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ptt_spider::governor::RateGovernor;
use ptt_spider::pipeline::{MediaError, Source, download_media};
use ptt_spider::transport::{FetchError, HttpClient};
use ptt_spider::{ErrorKind, MediaTask};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::support::forum::{
    BOARD, article, board_index, client_options, crawler, listing, mount_bytes, mount_html,
};
use crate::support::socket_guard::start_mock_server_or_skip;

async fn mount_throttled_image(server: &wiremock::MockServer, route: &str, retry_after: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", retry_after))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn p0_rate_limited_media_is_not_retried() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    mount_html(&server, &format!("/bbs/{BOARD}/index.html"), board_index(0)).await;
    mount_html(
        &server,
        &format!("/bbs/{BOARD}/index1.html"),
        listing(&[("爆", "[正妹] 熱門", "/bbs/Beauty/M.hot.html")]),
    )
    .await;
    mount_html(
        &server,
        "/bbs/Beauty/M.hot.html",
        article(
            "[正妹] 熱門",
            &[format!("{base}/img/busy.jpg"), format!("{base}/img/ok.jpg")],
        ),
    )
    .await;
    mount_throttled_image(&server, "/img/busy.jpg", "120").await;
    mount_bytes(&server, "/img/ok.jpg", b"ok").await;

    let out = TempDir::new().expect("temp dir");
    let root = out.path().join(BOARD);
    let source = Source::Board {
        board: BOARD.to_string(),
        pages: 1,
        threshold: 10,
    };
    let report = crawler(&base, &root, &client_options(), RateGovernor::disabled())
        .run(&source, CancellationToken::new())
        .await;

    let dir = root.join("[正妹] 熱門_100");
    assert_eq!(report.stats.media_failed, 1);
    assert_eq!(report.stats.media_downloaded, 1);
    assert!(!dir.join("busy.jpg").exists());
    assert_eq!(fs::read(dir.join("ok.jpg")).unwrap(), b"ok");
    server.verify().await;
}

#[tokio::test]
async fn p0_download_media_reports_retry_after_hint() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_throttled_image(&server, "/img/throttled.png", "30").await;

    let out = TempDir::new().expect("temp dir");
    let client = Arc::new(HttpClient::new(&client_options(), None).expect("client"));
    let task = MediaTask {
        resource_url: format!("{}/img/throttled.png", server.uri()),
        destination_path: out.path().join("doc_1").join("throttled.png"),
    };

    let err = download_media(client.as_ref(), &task).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RateLimited);
    match err {
        MediaError::Fetch(fetch @ FetchError::RateLimited { .. }) => {
            assert_eq!(fetch.retry_after_hint(), Some(Duration::from_secs(30)));
        }
        other => panic!("expected rate-limited fetch error, got {other:?}"),
    }
    assert!(!PathBuf::from(&task.destination_path).exists());
}
