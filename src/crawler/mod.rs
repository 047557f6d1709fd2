//! Crawler module for search page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Per-result field extraction
//! - Landing page and timeline response parsing
//! - HTTP fetching with retry logic
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod parser;
mod retry;

pub use coordinator::{start_boundary, Coordinator};
pub use extractor::{ExtractedResult, ExtractionError, ResultExtractor};
pub use fetcher::{
    apply_item_policy, build_http_client, FetchError, FetchMode, FetchedPage, PageFetcher,
};
pub use parser::{PageParser, ParseError, ParsedPage};
pub use retry::RetryPolicy;

use crate::config::Config;
use crate::output::{CrawlSummary, ResultSink};
use crate::storage::CheckpointStore;
use crate::{ConfigError, SweepError};
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl of the configured search between two dates
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Bound the configured query with `since:`/`until:`
/// 2. Build the HTTP client and page fetcher
/// 3. Resume from the checkpoint, if any
/// 4. Walk pages back until results predate `from`
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `from` - First day of the crawl window
/// * `to` - Day the search runs until
/// * `checkpoint` - Cursor persistence
/// * `sink` - Receives every extracted result
/// * `cancel` - Stops the crawl at the next suspension point
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl finished or was cancelled
/// * `Err(SweepError)` - Crawl failed
pub async fn run_crawl(
    config: &Config,
    from: NaiveDate,
    to: NaiveDate,
    checkpoint: Box<dyn CheckpointStore>,
    sink: &mut dyn ResultSink,
    cancel: CancellationToken,
) -> Result<CrawlSummary, SweepError> {
    if from > to {
        return Err(ConfigError::Validation(format!(
            "start date {} is after end date {}",
            from, to
        ))
        .into());
    }

    let criteria = config.query.to_builder().since(from).until(to).build();
    let mut coordinator = Coordinator::new(config, criteria, from, checkpoint, cancel)?;
    coordinator.run(sink).await
}
