//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with browser-like request headers
//! - Choosing the landing page or the timeline endpoint from the cursor
//! - Retrying failed pages with exponential backoff
//! - Applying the malformed-item policy to parsed pages

use crate::config::{Config, CrawlerConfig, EndpointConfig, MalformedItemPolicy};
use crate::crawler::extractor::{ExtractedResult, ExtractionError, ResultExtractor};
use crate::crawler::parser::{PageParser, ParseError, ParsedPage};
use crate::crawler::retry::RetryPolicy;
use crate::query::{Endpoints, SearchCriteria};
use crate::state::PaginationCursor;
use crate::SweepError;
use chrono::{DateTime, Utc};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS,
};
use reqwest::Client;
use std::fmt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use url::Url;

/// Which endpoint a fetch talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Landing search page, HTML
    FirstPage,

    /// Timeline endpoint, JSON
    NextPage,
}

impl FetchMode {
    /// The mode is decided by the presence of a cursor alone
    pub fn for_cursor(cursor: Option<&PaginationCursor>) -> Self {
        match cursor {
            None => FetchMode::FirstPage,
            Some(_) => FetchMode::NextPage,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMode::FirstPage => "first_page",
            FetchMode::NextPage => "next_page",
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed fetch attempt; every variant is retried
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Malformed result item: {0}")]
    Extraction(#[from] ExtractionError),
}

/// A successfully fetched and parsed page
#[derive(Debug)]
pub struct FetchedPage {
    /// Extracted results in page order
    pub results: Vec<ExtractedResult>,

    pub next_cursor: PaginationCursor,

    /// Timestamp of the last extracted result
    pub last_timestamp: Option<DateTime<Utc>>,

    /// Items dropped under [`MalformedItemPolicy::Skip`]
    pub skipped_items: usize,
}

/// Builds an HTTP client with the provider's expected request headers
///
/// # Arguments
///
/// * `endpoint` - Supplies the user agent
/// * `crawler` - Supplies the request and connect timeouts
///
/// # Example
///
/// ```no_run
/// use post_sweep::config::{CrawlerConfig, EndpointConfig};
/// use post_sweep::crawler::build_http_client;
///
/// let client = build_http_client(&EndpointConfig::default(), &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    endpoint: &EndpointConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US;q=0.3"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    Client::builder()
        .user_agent(endpoint.user_agent.as_str())
        .default_headers(headers)
        .timeout(crawler.request_timeout())
        .connect_timeout(crawler.connect_timeout())
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
}

/// Fetches search pages, retrying until one parses or the policy gives up
pub struct PageFetcher {
    client: Client,
    endpoints: Endpoints,
    parser: PageParser,
    retry: RetryPolicy,
    malformed_items: MalformedItemPolicy,
    cancel: CancellationToken,
}

impl PageFetcher {
    pub fn new(
        client: Client,
        endpoints: Endpoints,
        parser: PageParser,
        retry: RetryPolicy,
        malformed_items: MalformedItemPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            endpoints,
            parser,
            retry,
            malformed_items,
            cancel,
        }
    }

    /// Builds a fetcher from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoints, timeouts, retry and item policies
    /// * `host_offset_hours` - UTC offset applied to embedded timestamps
    /// * `cancel` - Aborts in-flight requests and backoff sleeps
    pub fn from_config(
        config: &Config,
        host_offset_hours: i64,
        cancel: CancellationToken,
    ) -> Result<Self, SweepError> {
        let endpoints = Endpoints::from_config(&config.endpoint)?;
        let client = build_http_client(&config.endpoint, &config.crawler)?;
        let extractor = ResultExtractor::new(endpoints.site.clone(), host_offset_hours)?;

        Ok(Self::new(
            client,
            endpoints,
            PageParser::new(extractor)?,
            RetryPolicy::from_config(&config.crawler),
            config.crawler.malformed_items,
            cancel,
        ))
    }

    /// Fetches one page of results
    ///
    /// Without a cursor the landing search page is requested; with one, the
    /// timeline endpoint. Any failure retries the whole fetch after a
    /// backoff delay.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - The page parsed
    /// * `Err(SweepError::CrawlAborted)` - The retry ceiling was reached
    /// * `Err(SweepError::Cancelled)` - The cancellation token fired
    pub async fn fetch_page(
        &self,
        criteria: &SearchCriteria,
        cursor: Option<&PaginationCursor>,
    ) -> Result<FetchedPage, SweepError> {
        let mode = FetchMode::for_cursor(cursor);
        let url = criteria.build_url(&self.endpoints, cursor);
        let mut attempts: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(SweepError::Cancelled);
            }

            attempts += 1;
            debug!(mode = %mode, attempt = attempts, "Will request [{}]", url);

            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => return Err(SweepError::Cancelled),
                outcome = self.try_fetch(mode, &url) => outcome,
            };

            let err = match outcome {
                Ok(page) => return Ok(page),
                Err(e) => e,
            };

            if !self.retry.allows_another(attempts) {
                error!("Giving up on {} after {} attempts: {}", url, attempts, err);
                return Err(SweepError::CrawlAborted {
                    attempts,
                    last_error: err.to_string(),
                });
            }

            let delay = self.retry.delay_with_jitter(attempts);
            warn!(
                "Attempt {} failed: {}. Retrying in {}ms",
                attempts,
                err,
                delay.as_millis()
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(SweepError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn try_fetch(&self, mode: FetchMode, url: &Url) -> Result<FetchedPage, FetchError> {
        let transport = |source: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.clone()).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;

        let parsed = match mode {
            FetchMode::FirstPage => self.parser.parse_first_page(&body)?,
            FetchMode::NextPage => self.parser.parse_next_page(&body)?,
        };

        apply_item_policy(parsed, self.malformed_items)
    }
}

/// Resolves per-item extraction failures
///
/// Under [`MalformedItemPolicy::Skip`] failed items are logged and dropped.
/// Under [`MalformedItemPolicy::RetryPage`] the first failure fails the page.
pub fn apply_item_policy(
    parsed: ParsedPage,
    policy: MalformedItemPolicy,
) -> Result<FetchedPage, FetchError> {
    let mut results = Vec::with_capacity(parsed.items.len());
    let mut skipped_items = 0;

    for item in parsed.items {
        match item {
            Ok(result) => results.push(result),
            Err(e) => match policy {
                MalformedItemPolicy::Skip => {
                    warn!("Skipping malformed result item: {}", e);
                    skipped_items += 1;
                }
                MalformedItemPolicy::RetryPage => return Err(e.into()),
            },
        }
    }

    let last_timestamp = results.last().map(|r| r.timestamp);

    Ok(FetchedPage {
        results,
        next_cursor: parsed.next_cursor,
        last_timestamp,
        skipped_items,
    })
}
