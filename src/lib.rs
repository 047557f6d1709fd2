//! Post-Sweep: an incremental crawler for a social search timeline
//!
//! This crate walks a search timeline backwards in time, page by page,
//! extracting every result until the results predate a start date. The
//! pagination cursor is checkpointed after every page so an interrupted
//! crawl resumes where it stopped.

pub mod clock;
pub mod config;
pub mod crawler;
pub mod output;
pub mod query;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Post-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Selector setup error: {0}")]
    Parse(#[from] crawler::ParseError),

    #[error("Crawl aborted after {attempts} attempts: {last_error}")]
    CrawlAborted { attempts: u32, last_error: String },

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid date '{0}', expected YYYYMMDD")]
    InvalidDate(String),
}

/// Result type alias for Post-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, ExtractedResult};
pub use query::{QueryBuilder, SearchCriteria};
pub use state::{CrawlPhase, PaginationCursor};
