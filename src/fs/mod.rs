//! Filesystem capability consumed by the index.
//!
//! The index never touches `std::fs` directly: it lists and reads files
//! through [`FileSystem`], which keeps it testable against an in-memory tree
//! and lets other sources (archives, remote snapshots) plug in.
//!
//! - [`MemoryFileSystem`] - ordered in-memory fixture
//! - [`WalkFileSystem`] - working tree on disk, gitignore-aware

mod memory;
mod walk;

pub use memory::MemoryFileSystem;
pub use walk::WalkFileSystem;

use anyhow::Result;

/// A snapshot of files addressed by repo-relative, slash-separated paths.
///
/// Implementations must be shareable across threads: index construction reads
/// files from a rayon pool.
pub trait FileSystem: Send + Sync {
    /// Every file in the snapshot, in a stable order
    fn list_relative_filenames(&self) -> Result<Vec<String>>;

    /// Full content of one file
    fn read_relative_filename(&self, name: &str) -> Result<Vec<u8>>;

    /// Human-readable root of the snapshot (for logs and messages)
    fn root_dir(&self) -> &str;
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    fn list_relative_filenames(&self) -> Result<Vec<String>> {
        (**self).list_relative_filenames()
    }

    fn read_relative_filename(&self, name: &str) -> Result<Vec<u8>> {
        (**self).read_relative_filename(name)
    }

    fn root_dir(&self) -> &str {
        (**self).root_dir()
    }
}
