//! Configuration module for post-sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The crawl dates are not part of the file; they come from the command line.
//!
//! # Example
//!
//! ```no_run
//! use post_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sweep.toml")).unwrap();
//! println!("Retry ceiling: {:?}", config.crawler.max_attempts);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, EndpointConfig, MalformedItemPolicy, NearConfig, OutputConfig,
    QueryConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
