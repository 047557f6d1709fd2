//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PaginationCursor`: the provider's opaque position token and the cursor jump
//! - `CrawlPhase`: where the crawl loop currently stands

mod cursor;
mod phase;

pub use cursor::{CursorError, PaginationCursor, CURSOR_JUMP_STEP};
pub use phase::CrawlPhase;
