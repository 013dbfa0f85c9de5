//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use ptt_spider::pipeline::Source;

/// Crawl a PTT board and mirror article images into local folders.
///
/// Walks the newest listing pages of a board (or reads a list of article
/// URLs), downloads every linked image and writes a README.md per article.
#[derive(Parser, Debug)]
#[command(name = "ptt-spider")]
#[command(author, version, about)]
pub struct Args {
    /// Board to crawl
    #[arg(short, long, default_value = "beauty")]
    pub board: String,

    /// Number of listing pages to walk, newest first (1-1000)
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub pages: u32,

    /// Minimum push count for an article to be crawled (may be negative)
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    pub push: i32,

    /// File with one article URL per line; replaces the board walk
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Config file (missing file means defaults)
    #[arg(short, long, default_value = "config.toml", value_name = "PATH")]
    pub config: PathBuf,

    /// Directory that receives the board folder
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Work source selected by the flags. A URL file wins over the board.
    pub fn source(&self) -> Source {
        match &self.file {
            Some(path) => Source::FixedList { path: path.clone() },
            None => Source::Board {
                board: self.board.clone(),
                pages: self.pages,
                threshold: self.push,
            },
        }
    }

    /// Default log level from the quiet/verbose flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Whether a flag asked for a specific level, overriding `RUST_LOG`.
    pub fn forces_log_level(&self) -> bool {
        self.quiet || self.verbose > 0
    }
}
