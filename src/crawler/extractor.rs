//! Per-result field extraction
//!
//! Turns one `div.tweet` element into an [`ExtractedResult`].

use crate::clock::{format_canonical, to_canonical_utc, CANONICAL_TIMEZONE};
use crate::crawler::parser::{compile, ParseError};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Selector};
use serde::{Serialize, Serializer};
use thiserror::Error;
use url::Url;

/// Errors raised while extracting a single result item
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Result item has no {0} element")]
    MissingElement(&'static str),

    #[error("Result item has no {0} attribute")]
    MissingAttribute(&'static str),

    #[error("Invalid {field} value '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Timestamp {0} is out of range")]
    TimestampOutOfRange(i64),

    #[error("Cannot build a link from '{0}'")]
    InvalidLink(String),
}

/// One crawled post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedResult {
    pub id: String,

    /// Display name of the author
    pub author: String,

    pub author_link: Url,

    pub permalink: Url,

    /// Canonical UTC instant, serialized as `YYYY-MM-DD HH:MM+00:00`
    #[serde(serialize_with = "serialize_canonical")]
    pub timestamp: DateTime<Utc>,

    /// Canonical UTC epoch seconds
    #[serde(rename = "ts")]
    pub raw_timestamp_epoch: i64,

    pub timezone: &'static str,

    pub text: String,

    pub like_count: u64,

    pub reply_count: u64,

    /// Hashtags without the leading `#`, serialized comma-joined
    #[serde(serialize_with = "serialize_tags")]
    pub tags: Vec<String>,
}

fn serialize_canonical<S: Serializer>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_canonical(instant))
}

fn serialize_tags<S: Serializer>(tags: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&tags.join(","))
}

/// Extracts structured records from parsed result elements
pub struct ResultExtractor {
    site: Url,
    host_offset_hours: i64,
    timestamp: Selector,
    text: Selector,
    reply_count: Selector,
    like_count: Selector,
    hashtag: Selector,
}

impl ResultExtractor {
    /// Creates an extractor
    ///
    /// # Arguments
    ///
    /// * `site` - Base URL that permalink paths and screen names resolve against
    /// * `host_offset_hours` - The fetching host's UTC offset, measured once per process
    pub fn new(site: Url, host_offset_hours: i64) -> Result<Self, ParseError> {
        Ok(Self {
            site,
            host_offset_hours,
            timestamp: compile(".tweet-timestamp span")?,
            text: compile("p.tweet-text")?,
            reply_count: compile(".ProfileTweet-action--reply .ProfileTweet-actionCount")?,
            like_count: compile(".ProfileTweet-action--favorite .ProfileTweet-actionCount")?,
            hashtag: compile("a.twitter-hashtag")?,
        })
    }

    /// Extracts one result from a `div.tweet` element
    ///
    /// The id and the embedded timestamp are mandatory. Counts default to 0
    /// and text to an empty string when their elements are missing.
    pub fn extract(&self, tweet: ElementRef<'_>) -> Result<ExtractedResult, ExtractionError> {
        let element = tweet.value();

        let id = element
            .attr("data-tweet-id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ExtractionError::MissingAttribute("data-tweet-id"))?
            .to_string();

        let author = element.attr("data-name").unwrap_or_default().to_string();
        let screen_name = element.attr("data-screen-name").unwrap_or_default();

        let permalink_path = match element.attr("data-permalink-path") {
            Some(path) if !path.is_empty() => path.to_string(),
            _ => format!("{}/status/{}", screen_name, id),
        };
        let permalink = self.site_link(&permalink_path)?;
        let author_link = self.site_link(screen_name)?;

        let stamp = tweet
            .select(&self.timestamp)
            .next()
            .ok_or(ExtractionError::MissingElement("tweet-timestamp"))?;
        let raw_time = stamp
            .value()
            .attr("data-time")
            .ok_or(ExtractionError::MissingAttribute("data-time"))?;
        let local_epoch: i64 = raw_time
            .trim()
            .parse()
            .map_err(|_| ExtractionError::InvalidNumber {
                field: "data-time",
                value: raw_time.to_string(),
            })?;
        let timestamp = to_canonical_utc(local_epoch, self.host_offset_hours)
            .ok_or(ExtractionError::TimestampOutOfRange(local_epoch))?;

        let text = tweet
            .select(&self.text)
            .next()
            .map(|p| p.text().collect::<String>())
            .unwrap_or_default();

        let reply_count = read_count(tweet, &self.reply_count)?;
        let like_count = read_count(tweet, &self.like_count)?;

        let tags = tweet
            .select(&self.hashtag)
            .map(|a| {
                a.text()
                    .collect::<String>()
                    .trim()
                    .trim_start_matches('#')
                    .to_string()
            })
            .collect();

        tracing::debug!(id = %id, "{}", text);

        Ok(ExtractedResult {
            id,
            author,
            author_link,
            permalink,
            timestamp,
            raw_timestamp_epoch: timestamp.timestamp(),
            timezone: CANONICAL_TIMEZONE,
            text,
            like_count,
            reply_count,
            tags,
        })
    }

    fn site_link(&self, path: &str) -> Result<Url, ExtractionError> {
        self.site
            .join(path.trim_start_matches('/'))
            .map_err(|_| ExtractionError::InvalidLink(path.to_string()))
    }
}

/// Reads `data-tweet-stat-count` from the first matching element, 0 if absent
fn read_count(tweet: ElementRef<'_>, selector: &Selector) -> Result<u64, ExtractionError> {
    let raw = tweet
        .select(selector)
        .next()
        .and_then(|el| el.value().attr("data-tweet-stat-count"));

    match raw {
        None => Ok(0),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ExtractionError::InvalidNumber {
                field: "data-tweet-stat-count",
                value: value.to_string(),
            }),
    }
}
