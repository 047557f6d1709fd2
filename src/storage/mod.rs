//! Storage module for crawl checkpoints
//!
//! The only durable crawl state is the last pagination cursor. This module
//! defines the [`CheckpointStore`] seam and a file-backed implementation.

mod file;
mod traits;

pub use file::FileCheckpoint;
pub use traits::{CheckpointStore, MemoryCheckpoint, StorageError, StorageResult};

use std::path::Path;

/// Opens the file checkpoint at `path`
///
/// When `fresh` is set any existing checkpoint is removed first, so the
/// crawl starts from the landing page.
pub fn open_checkpoint(path: &Path, fresh: bool) -> StorageResult<FileCheckpoint> {
    let mut checkpoint = FileCheckpoint::new(path);
    if fresh {
        checkpoint.clear()?;
    }
    Ok(checkpoint)
}
