//! Crawl summary reporting

use crate::clock::format_canonical;
use crate::state::PaginationCursor;
use chrono::{DateTime, Utc};
use std::fmt;

/// Why a crawl stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The progress marker moved before the start boundary
    ReachedStartDate,

    /// The cancellation token fired; the last cursor is checkpointed
    Cancelled,
}

impl CrawlOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlOutcome::ReachedStartDate => "reached_start_date",
            CrawlOutcome::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters collected over one crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub outcome: CrawlOutcome,

    /// Pages fetched successfully
    pub pages: u64,

    /// Results handed to the sink
    pub results: u64,

    /// Malformed items dropped
    pub skipped_items: u64,

    /// Cursor jumps applied after pages without dated results
    pub cursor_jumps: u64,

    /// Cursor to resume from
    pub last_cursor: Option<PaginationCursor>,

    /// Progress marker when the crawl stopped
    pub marker: Option<DateTime<Utc>>,
}

impl CrawlSummary {
    pub fn new(outcome: CrawlOutcome) -> Self {
        Self {
            outcome,
            pages: 0,
            results: 0,
            skipped_items: 0,
            cursor_jumps: 0,
            last_cursor: None,
            marker: None,
        }
    }
}

/// Prints a summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Outcome: {}", summary.outcome);
    println!("  Pages fetched: {}", summary.pages);
    println!("  Results written: {}", summary.results);
    println!("  Malformed items skipped: {}", summary.skipped_items);
    println!("  Cursor jumps: {}", summary.cursor_jumps);

    if let Some(marker) = &summary.marker {
        println!("  Reached: {}", format_canonical(marker));
    }

    if let Some(cursor) = &summary.last_cursor {
        println!("  Last cursor: {}", cursor);
    }
}
