//! Result sink trait and error types

use crate::crawler::ExtractedResult;
use thiserror::Error;

/// Errors that can occur while emitting results
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for extracted results
///
/// Results arrive in crawl order: page by page, and in page order within
/// a page.
pub trait ResultSink {
    fn accept(&mut self, result: &ExtractedResult) -> OutputResult<()>;

    /// Called after every page so a crash loses at most the page in flight
    fn flush(&mut self) -> OutputResult<()> {
        Ok(())
    }
}

impl ResultSink for Vec<ExtractedResult> {
    fn accept(&mut self, result: &ExtractedResult) -> OutputResult<()> {
        self.push(result.clone());
        Ok(())
    }
}
