//! Crawl phase definitions
//!
//! The orchestrator moves through these phases as pages are fetched.

use std::fmt;

/// Represents where the crawl loop currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// No cursor yet; the next request is the search landing page
    AwaitingFirstPage,

    /// A cursor is held; the next request is a timeline page
    AwaitingNextPage,

    /// The progress marker crossed the start boundary
    Done,
}

impl CrawlPhase {
    /// Picks the starting phase from whether a checkpointed cursor exists
    pub fn initial(has_cursor: bool) -> Self {
        if has_cursor {
            Self::AwaitingNextPage
        } else {
            Self::AwaitingFirstPage
        }
    }

    /// Returns true if the loop should stop
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Checks whether a transition to `next` is allowed
    ///
    /// Once a page has been fetched the crawl never returns to the landing
    /// page, and nothing leaves `Done`.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        match (self, next) {
            (Self::AwaitingFirstPage, Self::AwaitingNextPage | Self::Done) => true,
            (Self::AwaitingNextPage, Self::AwaitingNextPage | Self::Done) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingFirstPage => "awaiting_first_page",
            Self::AwaitingNextPage => "awaiting_next_page",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
