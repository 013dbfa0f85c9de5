//! Deterministic fakes for pipeline unit tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::extract::{ExtractError, Extractor};
use crate::render::{RenderError, Renderer};
use crate::transport::{FetchError, FetchResponse, Transport};
use crate::types::{ExtractedDocument, SummaryTask, WorkItem};

pub(crate) const BASE: &str = "https://forum.test";

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Body { status: u16, body: Vec<u8> },
    RateLimited { retry_after: Option<String> },
    NetworkError,
}

impl Reply {
    pub(crate) fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::Body {
            status: 200,
            body: body.into(),
        }
    }

    pub(crate) fn status(status: u16) -> Self {
        Self::Body {
            status,
            body: Vec::new(),
        }
    }
}

/// In-memory transport. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    replies: HashMap<String, Reply>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, url: impl Into<String>, reply: Reply) -> Self {
        self.replies.insert(url.into(), reply);
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(url.to_string());

        match self.replies.get(url).cloned().unwrap_or(Reply::status(404)) {
            Reply::Body { status, body } => {
                Ok(FetchResponse::new(url, status, Box::new(Cursor::new(body))))
            }
            Reply::RateLimited { retry_after } => Ok(FetchResponse::new(
                url,
                429,
                Box::new(Cursor::new(Vec::new())),
            )
            .with_retry_after(retry_after)),
            Reply::NetworkError => Err(FetchError::network(
                url,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            )),
        }
    }
}

/// Extractor keyed on the exact body text the fake transport serves.
#[derive(Debug, Default)]
pub(crate) struct FakeExtractor {
    highest_page: Option<u32>,
    listings: HashMap<String, Vec<WorkItem>>,
    documents: HashMap<String, ExtractedDocument>,
}

impl FakeExtractor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn highest_page(mut self, page: u32) -> Self {
        self.highest_page = Some(page);
        self
    }

    pub(crate) fn listing(mut self, body: &str, items: Vec<WorkItem>) -> Self {
        self.listings.insert(body.to_string(), items);
        self
    }

    pub(crate) fn document(mut self, body: &str, title: &str, resources: &[&str]) -> Self {
        self.documents.insert(
            body.to_string(),
            ExtractedDocument {
                title: title.to_string(),
                resource_urls: resources.iter().map(ToString::to_string).collect(),
            },
        );
        self
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    fn extract_listing(&self, body: &str) -> Result<Vec<WorkItem>, ExtractError> {
        self.listings
            .get(body)
            .cloned()
            .ok_or(ExtractError::MissingElement { selector: ".r-ent" })
    }

    fn extract_document(&self, body: &str) -> Result<ExtractedDocument, ExtractError> {
        self.documents
            .get(body)
            .cloned()
            .ok_or(ExtractError::MissingElement {
                selector: "#main-content",
            })
    }

    async fn highest_page_number(
        &self,
        _transport: &dyn Transport,
        _board: &str,
    ) -> Result<u32, ExtractError> {
        self.highest_page.ok_or(ExtractError::MissingElement {
            selector: ".btn-group-paging a",
        })
    }
}

/// Renderer that records tasks instead of writing files.
#[derive(Debug, Default)]
pub(crate) struct RecordingRenderer {
    rendered: Mutex<Vec<SummaryTask>>,
    fail: bool,
}

impl RecordingRenderer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            rendered: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn rendered(&self) -> Vec<SummaryTask> {
        self.rendered.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn render(&self, task: &SummaryTask) -> Result<PathBuf, RenderError> {
        if self.fail {
            return Err(RenderError::Write {
                path: task.destination_dir.join("README.md"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.rendered
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(task.clone());
        Ok(task.destination_dir.join("README.md"))
    }
}

pub(crate) fn item(title: &str, url: &str, popularity: i32) -> WorkItem {
    WorkItem {
        title: title.to_string(),
        source_url: url.to_string(),
        popularity,
        author: "tester".to_string(),
    }
}
