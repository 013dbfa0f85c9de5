//! PTT Spider Core Library
//!
//! Crawls a PTT board (or a fixed list of article URLs), downloads every
//! image linked from each article and writes one directory per article with
//! the images and a generated `README.md`.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`pipeline`] - Crawl orchestration: enumerator, worker pools, channel lifecycle
//! - [`transport`] - HTTP capability and the reqwest-backed client
//! - [`extract`] - Listing and article HTML extraction
//! - [`render`] - Summary file rendering
//! - [`governor`] - Randomized politeness delays
//! - [`naming`] - Directory and media filename rules
//! - [`config`] - TOML configuration file

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extract;
pub mod governor;
pub mod naming;
pub mod pipeline;
pub mod render;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use error::ErrorKind;
pub use extract::{ExtractError, Extractor, PttExtractor};
pub use governor::{DelayWindow, RateGovernor};
pub use pipeline::{Crawler, CrawlerSettings, RunReport, Source, StatsSnapshot};
pub use render::{MarkdownRenderer, RenderError, Renderer};
pub use transport::{FetchError, FetchResponse, HttpClient, Transport};
pub use types::{ExtractedDocument, MediaTask, SummaryTask, WorkItem};
