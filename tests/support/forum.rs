//! Minimal forum pages served by the mock server.

use std::sync::Arc;
use std::time::Duration;

use ptt_spider::governor::RateGovernor;
use ptt_spider::pipeline::{Crawler, CrawlerSettings};
use ptt_spider::render::MarkdownRenderer;
use ptt_spider::transport::{ClientOptions, HttpClient, consent_cookie_jar};
use ptt_spider::PttExtractor;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BOARD: &str = "Beauty";

/// Board root whose previous-page link points at `index{previous}.html`.
pub fn board_index(previous: u32) -> String {
    format!(
        r#"<html><body>
             <div class="btn-group btn-group-paging">
               <a class="btn wide" href="/bbs/{BOARD}/index1.html">最舊</a>
               <a class="btn wide" href="/bbs/{BOARD}/index{previous}.html">&lsaquo; 上頁</a>
               <a class="btn wide disabled">下頁 &rsaquo;</a>
             </div>
           </body></html>"#
    )
}

/// Listing page with one row per `(push, title, href)`.
pub fn listing(rows: &[(&str, &str, &str)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(push, title, href)| {
            format!(
                r#"<div class="r-ent">
                     <div class="nrec"><span class="hl f3">{push}</span></div>
                     <div class="title"><a href="{href}">{title}</a></div>
                     <div class="meta"><div class="author">poster</div></div>
                   </div>"#
            )
        })
        .collect();
    format!(r#"<html><body><div class="r-list-container">{rows}</div></body></html>"#)
}

/// Article page whose body links every URL in `links`.
pub fn article(title: &str, links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="{l}" rel="nofollow">{l}</a>"#))
        .collect();
    format!(
        r#"<html><body><div id="main-content" class="bbs-screen bbs-content">
             <div class="article-metaline"><span class="article-meta-tag">作者</span><span class="article-meta-value">poster</span></div>
             <div class="article-metaline"><span class="article-meta-tag">標題</span><span class="article-meta-value">{title}</span></div>
             {anchors}
           </div></body></html>"#
    )
}

pub async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

pub async fn mount_bytes(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

pub fn client_options() -> ClientOptions {
    ClientOptions {
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        ..ClientOptions::default()
    }
}

/// Crawler wired to real collaborators against `base_url`.
pub fn crawler(
    base_url: &str,
    output_root: &std::path::Path,
    options: &ClientOptions,
    governor: RateGovernor,
) -> Crawler {
    let mut settings = CrawlerSettings::new(output_root);
    settings.base_url = base_url.to_string();
    settings.document_workers = 2;
    settings.media_workers = 2;

    let jar = consent_cookie_jar(base_url).expect("cookie jar");
    let client = HttpClient::new(options, Some(jar)).expect("client");
    Crawler::new(
        settings,
        Arc::new(client),
        Arc::new(PttExtractor::new(base_url).with_https_upgrade(false)),
        Arc::new(MarkdownRenderer::new()),
        governor,
    )
}
