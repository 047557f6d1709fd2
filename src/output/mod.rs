//! Output module for crawl results and summaries
//!
//! This module handles:
//! - The [`ResultSink`] seam every extracted result flows through
//! - JSON-lines result files
//! - End-of-crawl summaries

mod jsonl;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use stats::{print_summary, CrawlOutcome, CrawlSummary};
pub use traits::{OutputError, OutputResult, ResultSink};
