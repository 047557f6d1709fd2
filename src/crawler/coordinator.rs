//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that walks the search timeline
//! backwards in time, including:
//! - Resuming from a checkpointed cursor
//! - Emitting results and persisting the cursor after every page
//! - Jumping the cursor past stretches without dated results
//! - Stopping once the progress marker passes the start boundary
//! - Honoring cancellation between pages

use crate::clock::{format_canonical, measure_host_offset_hours};
use crate::config::Config;
use crate::crawler::fetcher::PageFetcher;
use crate::output::{CrawlOutcome, CrawlSummary, ResultSink};
use crate::query::SearchCriteria;
use crate::state::{CrawlPhase, PaginationCursor};
use crate::storage::CheckpointStore;
use crate::SweepError;
use chrono::{DateTime, Duration as TimeDelta, NaiveDate, NaiveTime, TimeZone, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How far the progress marker moves back on a page without dated results
const MARKER_STEP_MINUTES: i64 = 10;

/// Main crawler coordinator structure
pub struct Coordinator {
    fetcher: PageFetcher,
    criteria: SearchCriteria,
    start_boundary: DateTime<Utc>,
    checkpoint: Box<dyn CheckpointStore>,
    page_delay: Duration,
    max_empty_pages: Option<u32>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `criteria` - The search to crawl, usually bounded by `since`/`until`
    /// * `start_date` - The crawl stops once results are older than this day (00:00 UTC)
    /// * `checkpoint` - Where the cursor is loaded from and saved to
    /// * `cancel` - Stops the crawl between pages
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(SweepError)` - Invalid endpoints or HTTP client setup failure
    pub fn new(
        config: &Config,
        criteria: SearchCriteria,
        start_date: NaiveDate,
        checkpoint: Box<dyn CheckpointStore>,
        cancel: CancellationToken,
    ) -> Result<Self, SweepError> {
        let host_offset_hours = match config.crawler.host_utc_offset_hours {
            Some(offset) => {
                info!("Using configured host UTC offset of {} hours", offset);
                offset
            }
            None => {
                let offset = measure_host_offset_hours();
                info!("Measured host UTC offset of {} hours", offset);
                offset
            }
        };

        let fetcher = PageFetcher::from_config(config, host_offset_hours, cancel.clone())?;

        Ok(Self {
            fetcher,
            criteria,
            start_boundary: start_boundary(start_date),
            checkpoint,
            page_delay: config.crawler.page_delay(),
            max_empty_pages: config.crawler.max_empty_pages,
            cancel,
        })
    }

    pub fn start_boundary(&self) -> DateTime<Utc> {
        self.start_boundary
    }

    /// Runs the crawl loop until the start boundary is reached
    ///
    /// Every page's results go to `sink` before its cursor is checkpointed,
    /// so a resumed crawl may repeat at most the page in flight.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The start boundary was reached or the crawl was cancelled
    /// * `Err(SweepError)` - A page exhausted its retries, or the sink or checkpoint failed
    pub async fn run(&mut self, sink: &mut dyn ResultSink) -> Result<CrawlSummary, SweepError> {
        let mut cursor = self.checkpoint.load()?;
        let mut phase = CrawlPhase::initial(cursor.is_some());
        let mut marker: Option<DateTime<Utc>> = None;
        let mut empty_pages: u32 = 0;
        let mut summary = CrawlSummary::new(CrawlOutcome::ReachedStartDate);

        match &cursor {
            Some(c) => info!("Resuming from checkpointed cursor {}", c),
            None => info!("No checkpoint, starting from the search page"),
        }
        info!(
            "Crawling \"{}\" back to {}",
            self.criteria.render_query(),
            format_canonical(&self.start_boundary)
        );

        while !phase.is_terminal() {
            let page = match self.fetcher.fetch_page(&self.criteria, cursor.as_ref()).await {
                Ok(page) => page,
                Err(SweepError::Cancelled) => {
                    return Ok(finish(summary, CrawlOutcome::Cancelled, cursor, marker));
                }
                Err(e) => return Err(e),
            };

            for result in &page.results {
                sink.accept(result)?;
            }
            sink.flush()?;

            summary.pages += 1;
            summary.results += page.results.len() as u64;
            summary.skipped_items += page.skipped_items as u64;

            let mut next = page.next_cursor;
            match page.last_timestamp {
                Some(timestamp) => {
                    marker = Some(timestamp);
                    empty_pages = 0;
                }
                None => {
                    empty_pages += 1;
                    let jumped = jump_or_keep(next.clone());
                    if jumped != next {
                        summary.cursor_jumps += 1;
                    }
                    next = jumped;
                    marker = marker.map(step_back);
                }
            }

            self.checkpoint.save(&next)?;
            cursor = Some(next);

            match &marker {
                Some(m) => info!(
                    "Page {}: {} results, reached {}",
                    summary.pages,
                    page.results.len(),
                    format_canonical(m)
                ),
                None => info!("Page {}: {} results", summary.pages, page.results.len()),
            }

            let next_phase = if marker.is_some_and(|m| m < self.start_boundary) {
                CrawlPhase::Done
            } else {
                CrawlPhase::AwaitingNextPage
            };
            debug!("Phase {} -> {}", phase, next_phase);
            debug_assert!(phase.can_transition_to(next_phase));
            phase = next_phase;

            if phase.is_terminal() {
                break;
            }

            if let Some(limit) = self.max_empty_pages {
                if empty_pages >= limit {
                    return Err(SweepError::CrawlAborted {
                        attempts: empty_pages,
                        last_error: format!(
                            "{} consecutive pages without dated results",
                            empty_pages
                        ),
                    });
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Ok(finish(summary, CrawlOutcome::Cancelled, cursor, marker));
                }
                _ = tokio::time::sleep(self.page_delay) => {}
            }
        }

        info!(
            "Reached the start boundary after {} pages and {} results",
            summary.pages, summary.results
        );
        Ok(finish(summary, CrawlOutcome::ReachedStartDate, cursor, marker))
    }
}

/// `start_date` at 00:00 UTC
pub fn start_boundary(start_date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&start_date.and_time(NaiveTime::MIN))
}

/// Applies the cursor jump, falling back to the unchanged cursor
fn jump_or_keep(cursor: PaginationCursor) -> PaginationCursor {
    match cursor.jump_back() {
        Ok(jumped) => {
            info!("No dated results, jumping cursor {} -> {}", cursor, jumped);
            jumped
        }
        Err(e) => {
            warn!("Cannot jump cursor {}: {}. Reusing it unchanged", cursor, e);
            cursor
        }
    }
}

fn step_back(marker: DateTime<Utc>) -> DateTime<Utc> {
    marker
        .checked_sub_signed(TimeDelta::minutes(MARKER_STEP_MINUTES))
        .unwrap_or(marker)
}

fn finish(
    mut summary: CrawlSummary,
    outcome: CrawlOutcome,
    cursor: Option<PaginationCursor>,
    marker: Option<DateTime<Utc>>,
) -> CrawlSummary {
    if outcome == CrawlOutcome::Cancelled {
        info!("Crawl cancelled after {} pages", summary.pages);
    }
    summary.outcome = outcome;
    summary.last_cursor = cursor;
    summary.marker = marker;
    summary
}
