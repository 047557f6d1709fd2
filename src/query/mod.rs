//! Query building
//!
//! This module turns high-level filter criteria into the search provider's
//! query syntax and request URLs:
//! - `QueryBuilder` accumulates criteria before a crawl starts
//! - `SearchCriteria` renders the query string and builds first/next page URLs
//! - `Endpoints` holds the provider URLs

mod criteria;
mod endpoint;

pub use criteria::{NearLocation, QueryBuilder, SearchCriteria, DEFAULT_RADIUS_MILES};
pub use endpoint::Endpoints;

use crate::ConfigError;
use chrono::NaiveDate;

/// Parses a `YYYYMMDD` date such as `20170720`
///
/// # Example
///
/// ```
/// use post_sweep::query::parse_compact_date;
///
/// let date = parse_compact_date("20170720").unwrap();
/// assert_eq!(date.to_string(), "2017-07-20");
/// ```
pub fn parse_compact_date(raw: &str) -> Result<NaiveDate, ConfigError> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::InvalidDate(raw.to_string()));
    }

    NaiveDate::parse_from_str(raw, "%Y%m%d").map_err(|_| ConfigError::InvalidDate(raw.to_string()))
}
