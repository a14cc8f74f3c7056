//! Code-search evidence records.

use serde::{Deserialize, Serialize};

/// A single search hit: a line in a file that matched a query, with
/// surrounding context trimmed into a snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Path relative to the search root.
    pub path: String,
    /// 1-based line number.
    pub line: u32,
    /// Trimmed line content.
    pub snippet: String,
}

impl SearchHit {
    /// Construct a search hit. `line` must be `>= 1`; callers are expected
    /// to uphold this (line numbers come from readers that start counting
    /// at 1).
    pub fn new(path: impl Into<String>, line: u32, snippet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            snippet: snippet.into(),
        }
    }

    /// The `(path, line)` identity used to deduplicate hits.
    pub fn identity(&self) -> (&str, u32) {
        (&self.path, self.line)
    }
}
