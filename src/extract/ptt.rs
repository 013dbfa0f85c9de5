//! HTML extraction rules for PTT listing and article pages.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use super::{ExtractError, Extractor};
use crate::naming::{DEFAULT_IMAGE_EXTENSION, IMGUR_HOST};
use crate::transport::{PTT_BASE_URL, Transport};
use crate::types::{EXCEPTIONAL_POPULARITY, ExtractedDocument, FLOOR_POPULARITY, WorkItem};

// Hardcoded selectors never fail to parse.
#[allow(clippy::expect_used)]
static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".r-ent").expect("BUG: hardcoded selector '.r-ent'"));

#[allow(clippy::expect_used)]
static TITLE_LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".title a").expect("BUG: hardcoded selector '.title a'"));

#[allow(clippy::expect_used)]
static AUTHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".meta .author").expect("BUG: hardcoded selector '.meta .author'")
});

#[allow(clippy::expect_used)]
static PUSH_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".nrec span").expect("BUG: hardcoded selector '.nrec span'"));

#[allow(clippy::expect_used)]
static MAIN_CONTENT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#main-content").expect("BUG: hardcoded selector '#main-content'")
});

#[allow(clippy::expect_used)]
static META_TAG_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".article-meta-tag").expect("BUG: hardcoded selector '.article-meta-tag'")
});

#[allow(clippy::expect_used)]
static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("BUG: hardcoded selector 'a[href]'"));

#[allow(clippy::expect_used)]
static PAGING_LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".btn-group-paging a").expect("BUG: hardcoded selector '.btn-group-paging a'")
});

#[allow(clippy::expect_used)]
static PAGE_NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"index(\d+)\.html").expect("BUG: hardcoded page regex"));

/// Titles containing this marker are board announcements.
const ANNOUNCEMENT_MARKER: &str = "公告";

/// Text of the meta tag that precedes the article title.
const TITLE_META_TAG: &str = "標題";

/// Text of the paging link pointing at the previous (older) page.
const PREVIOUS_PAGE_LABEL: &str = "上頁";

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// Extractor for the forum's HTML.
///
/// Image links in an article are deduplicated in first-seen order: a post
/// that repeats a link yields it once, so each media file is downloaded and
/// listed in the summary a single time.
#[derive(Debug, Clone)]
pub struct PttExtractor {
    base_url: String,
    upgrade_to_https: bool,
}

impl Default for PttExtractor {
    fn default() -> Self {
        Self::new(PTT_BASE_URL)
    }
}

impl PttExtractor {
    /// Creates an extractor resolving relative links against `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            upgrade_to_https: true,
        }
    }

    /// Controls whether `http://` resource links are rewritten to `https://`.
    ///
    /// Enabled by default.
    #[must_use]
    pub fn with_https_upgrade(mut self, enabled: bool) -> Self {
        self.upgrade_to_https = enabled;
        self
    }

    /// URL of the listing root of `board`.
    #[must_use]
    pub fn board_index_url(&self, board: &str) -> String {
        format!("{}/bbs/{board}/index.html", self.base_url)
    }

    fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{href}", self.base_url)
        } else {
            format!("{}/{href}", self.base_url)
        }
    }

    fn normalize_resource(&self, href: &str) -> Option<String> {
        let href = href.trim();
        let href = if let Some(rest) = href.strip_prefix("//") {
            format!("https://{rest}")
        } else if self.upgrade_to_https
            && let Some(rest) = href.strip_prefix("http://")
        {
            format!("https://{rest}")
        } else {
            href.to_string()
        };

        let lower = href.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            return Some(href);
        }

        if lower.contains(&format!("{IMGUR_HOST}/")) && !lower.contains(&format!("{IMGUR_HOST}/a/")) {
            let last = href.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
            if !last.is_empty() && !last.contains('.') {
                return Some(format!("{}{DEFAULT_IMAGE_EXTENSION}", href.trim_end_matches('/')));
            }
        }

        None
    }
}

/// Parses the push-count cell of a listing row.
///
/// `爆` is exceptional, `XX` is the floor, `X<n>` is `-n`, digits are taken
/// as-is and anything else (including an empty cell) is zero.
#[must_use]
pub(crate) fn parse_popularity(raw: &str) -> i32 {
    let raw = raw.trim();
    if raw == "爆" {
        return EXCEPTIONAL_POPULARITY;
    }
    if let Some(rest) = raw.strip_prefix('X') {
        if rest == "X" {
            return FLOOR_POPULARITY;
        }
        return rest.parse::<i32>().map_or(0, |n| -n);
    }
    raw.parse::<i32>().unwrap_or(0)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_highest_page(body: &str) -> Result<u32, ExtractError> {
    let html = Html::parse_document(body);
    let link = html
        .select(&PAGING_LINK_SELECTOR)
        .find(|a| element_text(*a).contains(PREVIOUS_PAGE_LABEL))
        .ok_or(ExtractError::MissingElement {
            selector: ".btn-group-paging a (上頁)",
        })?;

    let href = link.value().attr("href").unwrap_or_default();
    let previous = PAGE_NUMBER_PATTERN
        .captures(href)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .ok_or_else(|| ExtractError::InvalidPageNumber {
            href: href.to_string(),
        })?;

    Ok(previous.saturating_add(1))
}

#[async_trait]
impl Extractor for PttExtractor {
    fn extract_listing(&self, body: &str) -> Result<Vec<WorkItem>, ExtractError> {
        if body.trim().is_empty() {
            return Err(ExtractError::EmptyBody);
        }
        let html = Html::parse_document(body);

        let mut items = Vec::new();
        for row in html.select(&ROW_SELECTOR) {
            // Deleted posts have no link.
            let Some(link) = row.select(&TITLE_LINK_SELECTOR).next() else {
                continue;
            };
            let title = element_text(link);
            if title.contains(ANNOUNCEMENT_MARKER) {
                continue;
            }
            let Some(href) = link.value().attr("href") else {
                continue;
            };

            let author = row
                .select(&AUTHOR_SELECTOR)
                .next()
                .map(element_text)
                .unwrap_or_default();
            let popularity = row
                .select(&PUSH_SELECTOR)
                .next()
                .map_or(0, |span| parse_popularity(&element_text(span)));

            items.push(WorkItem {
                title,
                source_url: self.absolute_url(href),
                popularity,
                author,
            });
        }
        Ok(items)
    }

    fn extract_document(&self, body: &str) -> Result<ExtractedDocument, ExtractError> {
        if body.trim().is_empty() {
            return Err(ExtractError::EmptyBody);
        }
        let html = Html::parse_document(body);
        if html.select(&MAIN_CONTENT_SELECTOR).next().is_none() {
            return Err(ExtractError::MissingElement {
                selector: "#main-content",
            });
        }

        let title = html
            .select(&META_TAG_SELECTOR)
            .find(|tag| element_text(*tag) == TITLE_META_TAG)
            .and_then(|tag| tag.next_siblings().find_map(ElementRef::wrap))
            .map(element_text)
            .unwrap_or_default();

        let mut resource_urls: Vec<String> = Vec::new();
        for link in html.select(&LINK_SELECTOR) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if let Some(url) = self.normalize_resource(href)
                && !resource_urls.contains(&url)
            {
                resource_urls.push(url);
            }
        }

        Ok(ExtractedDocument {
            title,
            resource_urls,
        })
    }

    #[instrument(skip(self, transport))]
    async fn highest_page_number(
        &self,
        transport: &dyn Transport,
        board: &str,
    ) -> Result<u32, ExtractError> {
        let url = self.board_index_url(board);
        let body = transport.get(&url).await?.error_for_status()?.text().await?;
        let page = parse_highest_page(&body)?;
        debug!(board, page, "highest listing page");
        Ok(page)
    }
}
