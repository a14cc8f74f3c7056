//! The file manifest — one sequential scan of a repository root.

use serde::{Deserialize, Serialize};

/// One entry from a manifest scan. Immutable once built; any I/O error
/// encountered while stat-ing a path simply drops that path from the
/// manifest rather than aborting the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the scanned root, using `/` separators.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Modification time, as seconds since the Unix epoch.
    pub mtime: i64,
}

impl ManifestEntry {
    /// Construct a manifest entry.
    pub fn new(path: impl Into<String>, size: u64, mtime: i64) -> Self {
        Self {
            path: path.into(),
            size,
            mtime,
        }
    }

    /// The top-level directory component of `path`, or `None` for a
    /// root-level file. Used by the planner to assign tiers.
    pub fn top_level_dir(&self) -> Option<&str> {
        self.path.split('/').next().filter(|_| self.path.contains('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_dir_nested() {
        let e = ManifestEntry::new("src/lib.rs", 10, 0);
        assert_eq!(e.top_level_dir(), Some("src"));
    }

    #[test]
    fn top_level_dir_root_file() {
        let e = ManifestEntry::new("LICENSE", 10, 0);
        assert_eq!(e.top_level_dir(), None);
    }
}
