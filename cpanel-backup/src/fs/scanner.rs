//! Archive discovery on the local filesystem.
//!
//! The control panel drops its archive into the account's home directory,
//! so only the top level of the search directory is scanned.

use super::metadata::FileStat;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Single-`*` file name glob such as `backup-*.tar.gz`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPattern {
    prefix: String,
    suffix: String,
}

impl ArtifactPattern {
    /// Parse a glob with exactly one `*`
    pub fn parse(glob: &str) -> Option<Self> {
        let (prefix, suffix) = glob.split_once('*')?;
        if suffix.contains('*') {
            return None;
        }
        Some(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Check a bare file name against the pattern
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.len() >= self.prefix.len() + self.suffix.len()
            && file_name.starts_with(&self.prefix)
            && file_name.ends_with(&self.suffix)
    }
}

impl std::fmt::Display for ArtifactPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*{}", self.prefix, self.suffix)
    }
}

/// List regular files directly inside `dir` whose names match `pattern`.
///
/// Only a failure to read `dir` itself is an error. Entries that vanish
/// between listing and stat, dangling symlinks and unreadable entries are
/// skipped.
pub fn scan_matching(dir: &Path, pattern: &ArtifactPattern) -> std::io::Result<Vec<FileStat>> {
    let mut matches = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !pattern.matches(&file_name) {
            continue;
        }

        match FileStat::from_path(entry.path()) {
            Ok(stat) => matches.push(stat),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(matches)
}
