//! Filesystem access for archive discovery, sizing and cleanup.
//!
//! The [`ArtifactFs`] trait is the seam the watcher and orchestrator poll
//! through, so both can be driven by scripted observations in tests.

pub mod metadata;
pub mod scanner;

pub use metadata::FileStat;
pub use scanner::ArtifactPattern;

use std::path::Path;

/// Observable filesystem operations needed by a backup run
pub trait ArtifactFs: Send + Sync {
    /// Files directly inside `dir` matching `pattern`
    fn list_matching(&self, dir: &Path, pattern: &ArtifactPattern) -> std::io::Result<Vec<FileStat>>;

    /// Current size of `path` in bytes
    fn size_of(&self, path: &Path) -> std::io::Result<u64>;

    /// Delete the local archive
    fn remove(&self, path: &Path) -> std::io::Result<()>;
}

/// The real local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl ArtifactFs for LocalFs {
    fn list_matching(&self, dir: &Path, pattern: &ArtifactPattern) -> std::io::Result<Vec<FileStat>> {
        scanner::scan_matching(dir, pattern)
    }

    fn size_of(&self, path: &Path) -> std::io::Result<u64> {
        // fresh metadata call each time, nothing cached
        Ok(std::fs::metadata(path)?.len())
    }

    fn remove(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_file(path)
    }
}
