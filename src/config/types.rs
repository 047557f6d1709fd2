use crate::query::{QueryBuilder, SearchCriteria, DEFAULT_RADIUS_MILES};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for post-sweep
///
/// Every section is optional in the TOML file; missing sections fall back
/// to their defaults. Without a `[query]` section the crawl uses
/// [`QueryConfig::preset`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub endpoint: EndpointConfig,
    pub output: OutputConfig,
    pub query: QueryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            endpoint: EndpointConfig::default(),
            output: OutputConfig::default(),
            query: QueryConfig::preset(),
        }
    }
}

/// How to treat a result item that cannot be extracted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedItemPolicy {
    /// Drop the item, keep the rest of the page
    #[default]
    Skip,

    /// Treat the whole page as failed and fetch it again
    RetryPage,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Pause between page fetches (milliseconds)
    pub page_delay_ms: u64,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Attempts per page before the crawl is aborted; `None` retries forever
    pub max_attempts: Option<u32>,

    /// Ignore `max_attempts` and retry failed pages indefinitely
    pub retry_forever: bool,

    /// First retry delay (milliseconds), doubled on every further attempt
    pub retry_base_delay_ms: u64,

    /// Upper bound on a single retry delay (milliseconds)
    pub retry_max_delay_ms: u64,

    pub malformed_items: MalformedItemPolicy,

    /// Overrides the measured host UTC offset
    pub host_utc_offset_hours: Option<i64>,

    /// Consecutive pages without dated results before the crawl is aborted
    pub max_empty_pages: Option<u32>,
}

impl CrawlerConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: 500,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_attempts: Some(10),
            retry_forever: false,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 60_000,
            malformed_items: MalformedItemPolicy::Skip,
            host_utc_offset_hours: None,
            max_empty_pages: None,
        }
    }
}

/// Search provider endpoints and request identity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EndpointConfig {
    /// Base URL for permalinks and author pages
    pub site_url: String,

    /// Landing search page used for the first request
    pub search_url: String,

    /// Timeline endpoint used for cursor requests
    pub timeline_url: String,

    pub user_agent: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            site_url: "https://twitter.com/".to_string(),
            search_url: "https://twitter.com/search".to_string(),
            timeline_url: "https://twitter.com/i/search/timeline".to_string(),
            user_agent:
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.11; rv:54.0) Gecko/20100101 Firefox/54.0"
                    .to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory for logs, checkpoints and results
    pub data_dir: PathBuf,

    /// JSON-lines result file; defaults to `<data-dir>/<from>_<to>.jsonl`
    pub results_path: Option<PathBuf>,

    /// Cursor checkpoint file; defaults to `<data-dir>/<from>_<to>_maxpos.log`
    pub checkpoint_path: Option<PathBuf>,
}

impl OutputConfig {
    /// Stem shared by the per-run files, e.g. `20170701_20170710`
    pub fn run_stem(from: &str, to: &str) -> String {
        format!("{}_{}", from, to)
    }

    pub fn log_path(&self, from: &str, to: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.log", Self::run_stem(from, to)))
    }

    pub fn resolved_results_path(&self, from: &str, to: &str) -> PathBuf {
        self.results_path.clone().unwrap_or_else(|| {
            self.data_dir
                .join(format!("{}.jsonl", Self::run_stem(from, to)))
        })
    }

    pub fn resolved_checkpoint_path(&self, from: &str, to: &str) -> PathBuf {
        self.checkpoint_path.clone().unwrap_or_else(|| {
            self.data_dir
                .join(format!("{}_maxpos.log", Self::run_stem(from, to)))
        })
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            results_path: None,
            checkpoint_path: None,
        }
    }
}

/// `near:` clause in configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NearConfig {
    pub place: String,

    #[serde(default = "default_radius")]
    pub radius_miles: u32,
}

fn default_radius() -> u32 {
    DEFAULT_RADIUS_MILES
}

/// Search filters; the crawl dates come from the command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct QueryConfig {
    pub all_of: Vec<String>,
    pub exact_phrase: Option<String>,
    pub any_of: Vec<String>,
    pub hashtags: Vec<String>,
    pub exclude: Vec<String>,
    pub from_accounts: Vec<String>,
    pub to_accounts: Vec<String>,
    pub mentioning: Vec<String>,
    pub near: Option<NearConfig>,
    pub language: Option<String>,
}

impl QueryConfig {
    /// Seeds a [`QueryBuilder`] with every configured filter
    pub fn to_builder(&self) -> QueryBuilder {
        let mut builder = SearchCriteria::builder();

        for term in &self.all_of {
            builder = builder.all_of(term.as_str());
        }
        if let Some(phrase) = &self.exact_phrase {
            builder = builder.exact_phrase(phrase.as_str());
        }
        for term in &self.any_of {
            builder = builder.any_of(term.as_str());
        }
        for tag in &self.hashtags {
            builder = builder.hashtag(tag.as_str());
        }
        for term in &self.exclude {
            builder = builder.exclude(term.as_str());
        }
        for account in &self.from_accounts {
            builder = builder.from_account(account.as_str());
        }
        for account in &self.to_accounts {
            builder = builder.to_account(account.as_str());
        }
        for account in &self.mentioning {
            builder = builder.mentioning(account.as_str());
        }
        if let Some(near) = &self.near {
            builder = builder.near_within(near.place.as_str(), near.radius_miles);
        }
        if let Some(language) = &self.language {
            builder = builder.language(language.as_str());
        }

        builder
    }

    /// Apple-product mentions in English
    pub fn preset() -> Self {
        Self {
            any_of: ["iphone", "ipad", "macbook", "ios"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            language: Some("en".to_string()),
            ..Self::default()
        }
    }
}
