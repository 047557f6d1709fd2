//! Response parsing for search pages
//!
//! This module handles the two response shapes the provider returns:
//! - the landing search page, a full HTML document whose results container
//!   carries the next cursor
//! - timeline pages, a JSON object with `min_position` and an `items_html`
//!   fragment
//!
//! Both shapes share the same result item markup.

use crate::crawler::extractor::{ExtractedResult, ExtractionError, ResultExtractor};
use crate::state::PaginationCursor;
use scraper::{Html, Selector};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised when a response does not have the expected shape
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Response has no {0} element")]
    MissingElement(&'static str),

    #[error("Response {element} has no {attribute} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Invalid timeline JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid selector '{0}'")]
    Selector(String),
}

/// Compiles a CSS selector
pub(crate) fn compile(css: &'static str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("{}: {:?}", css, e)))
}

/// Body of a timeline (next page) response
#[derive(Debug, Deserialize)]
struct TimelineResponse {
    min_position: String,
    items_html: String,
}

/// A parsed page before the malformed-item policy is applied
#[derive(Debug)]
pub struct ParsedPage {
    pub next_cursor: PaginationCursor,

    /// One entry per result item, in page order
    pub items: Vec<Result<ExtractedResult, ExtractionError>>,
}

/// Parses search responses into cursors and result items
pub struct PageParser {
    extractor: ResultExtractor,
    container: Selector,
    item: Selector,
    tweet: Selector,
}

impl PageParser {
    pub fn new(extractor: ResultExtractor) -> Result<Self, ParseError> {
        Ok(Self {
            extractor,
            container: compile("#timeline .stream-container")?,
            item: compile("li.stream-item")?,
            tweet: compile("div.tweet")?,
        })
    }

    /// Parses the landing search page
    ///
    /// The next cursor is the `data-max-position` attribute of the results
    /// container; its absence is a parse error.
    pub fn parse_first_page(&self, html: &str) -> Result<ParsedPage, ParseError> {
        let document = Html::parse_document(html);

        let container = document
            .select(&self.container)
            .next()
            .ok_or(ParseError::MissingElement("#timeline .stream-container"))?;

        let cursor = container
            .value()
            .attr("data-max-position")
            .filter(|c| !c.is_empty())
            .ok_or(ParseError::MissingAttribute {
                element: "stream-container",
                attribute: "data-max-position",
            })?;

        Ok(ParsedPage {
            next_cursor: PaginationCursor::new(cursor),
            items: self.extract_items(&document),
        })
    }

    /// Parses a timeline page (`{"min_position": ..., "items_html": ...}`)
    pub fn parse_next_page(&self, body: &str) -> Result<ParsedPage, ParseError> {
        let response: TimelineResponse = serde_json::from_str(body)?;
        let fragment = Html::parse_fragment(&response.items_html);

        Ok(ParsedPage {
            next_cursor: PaginationCursor::new(response.min_position),
            items: self.extract_items(&fragment),
        })
    }

    fn extract_items(&self, document: &Html) -> Vec<Result<ExtractedResult, ExtractionError>> {
        document
            .select(&self.item)
            .map(|item| match item.select(&self.tweet).next() {
                Some(tweet) => self.extractor.extract(tweet),
                None => Err(ExtractionError::MissingElement("div.tweet")),
            })
            .collect()
    }
}
