//! Checkpoint store trait and error types

use crate::state::PaginationCursor;
use thiserror::Error;

/// Errors that can occur while reading or writing a checkpoint
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Checkpoint IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable home of the last pagination cursor
///
/// A crawl saves its cursor after every page so a restarted run resumes
/// from the timeline endpoint instead of the landing page.
pub trait CheckpointStore {
    /// Returns the saved cursor, or `None` when there is no usable checkpoint
    fn load(&self) -> StorageResult<Option<PaginationCursor>>;

    /// Replaces the saved cursor
    fn save(&mut self, cursor: &PaginationCursor) -> StorageResult<()>;

    /// Removes any saved cursor
    fn clear(&mut self) -> StorageResult<()>;
}

/// In-memory store, used by library callers that do not need durability
#[derive(Debug, Default)]
pub struct MemoryCheckpoint {
    cursor: Option<PaginationCursor>,
}

impl MemoryCheckpoint {
    pub fn new(cursor: Option<PaginationCursor>) -> Self {
        Self { cursor }
    }
}

impl CheckpointStore for MemoryCheckpoint {
    fn load(&self) -> StorageResult<Option<PaginationCursor>> {
        Ok(self.cursor.clone())
    }

    fn save(&mut self, cursor: &PaginationCursor) -> StorageResult<()> {
        self.cursor = Some(cursor.clone());
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.cursor = None;
        Ok(())
    }
}
