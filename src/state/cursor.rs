//! Pagination cursor handling
//!
//! The provider hands back an opaque position token with every page. The
//! crawler passes it back verbatim, except when a page yields nothing
//! dated, in which case the numeric middle field is pushed backwards to
//! force the next request into an earlier window.

use std::fmt;
use thiserror::Error;

/// Amount subtracted from the cursor's numeric field by a jump
///
/// Snowflake ids advance by roughly 4.2e9 per second, so this moves the
/// cursor back about ten minutes.
pub const CURSOR_JUMP_STEP: i64 = 4_200_000_000 * 600;

/// Errors raised by structured cursor operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("Cursor '{0}' does not have the <head>-<number>-<tail> shape")]
    Malformed(String),

    #[error("Cursor '{0}' cannot be moved back without overflowing")]
    Overflow(String),
}

/// An opaque pagination token returned by the search provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaginationCursor(String);

impl PaginationCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a copy of this cursor moved back by [`CURSOR_JUMP_STEP`]
    ///
    /// The cursor must look like `<head>-<number>-<tail>` where neither
    /// `head` nor `tail` contains a hyphen. The middle field may already be
    /// negative from an earlier jump.
    ///
    /// # Example
    ///
    /// ```
    /// use post_sweep::state::PaginationCursor;
    ///
    /// let cursor = PaginationCursor::new("TWEET-886658155624579073-886660378618245120");
    /// let jumped = cursor.jump_back().unwrap();
    /// assert_eq!(jumped.as_str(), "TWEET-886655635624579073-886660378618245120");
    /// ```
    pub fn jump_back(&self) -> Result<Self, CursorError> {
        let (head, rest) = self
            .0
            .split_once('-')
            .ok_or_else(|| CursorError::Malformed(self.0.clone()))?;
        let (middle, tail) = rest
            .rsplit_once('-')
            .ok_or_else(|| CursorError::Malformed(self.0.clone()))?;

        if head.is_empty() || tail.is_empty() {
            return Err(CursorError::Malformed(self.0.clone()));
        }

        let offset: i64 = middle
            .parse()
            .map_err(|_| CursorError::Malformed(self.0.clone()))?;

        let moved = offset
            .checked_sub(CURSOR_JUMP_STEP)
            .ok_or_else(|| CursorError::Overflow(self.0.clone()))?;

        Ok(Self(format!("{}-{}-{}", head, moved, tail)))
    }
}

impl fmt::Display for PaginationCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
