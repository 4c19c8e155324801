//! File metadata snapshots used to judge backup archives.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Size and modification time of one file at the moment it was observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    /// Full path to the file
    pub path: PathBuf,

    /// File size in bytes
    pub size: u64,

    /// Last modified time
    pub modified: SystemTime,
}

impl FileStat {
    /// Read metadata for a path, following symlinks
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified()?,
        })
    }

    /// Age relative to `now`. Timestamps ahead of `now` (clock drift) count as zero.
    pub fn age_at(&self, now: SystemTime) -> std::time::Duration {
        now.duration_since(self.modified).unwrap_or_default()
    }
}
