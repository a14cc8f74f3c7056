//! # research-search — code search (C3)
//!
//! Produces ranked [`SearchHit`]s for a query over a candidate file set:
//! symbol-index hits first (definitions, then usages), then a linear scan
//! of text files for lines containing every query token, stopping once
//! `max_results` is reached.

use research_symbols::SymbolIndex;
use research_types::SearchHit;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Files larger than this are never scanned as text.
pub const MAX_TEXT_FILE_BYTES: u64 = 1024 * 1024;

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "pdf", "zip", "gz", "tar", "xz", "7z", "so", "dll",
    "dylib", "exe", "bin", "class", "jar", "wasm", "o", "a", "woff", "woff2", "ttf", "otf",
];

const HIDDEN_VCS_DIRS: &[&str] = &[".git", ".hg", ".svn", ".jj"];

/// Lowercase, word-character tokens of length > 2 extracted from `query`.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in query.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            current.push(ch.to_ascii_lowercase());
        } else if !current.is_empty() {
            if current.len() > 2 {
                tokens.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
    }
    if current.len() > 2 {
        tokens.push(current);
    }
    tokens
}

/// Whether `path` sits under a hidden VCS directory.
fn under_hidden_vcs(path: &Path) -> bool {
    path.components().any(|c| {
        let s = c.as_os_str().to_string_lossy();
        HIDDEN_VCS_DIRS.iter().any(|d| s == *d)
    })
}

/// Whether `path`'s extension is a known binary type.
fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| BINARY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Whether `full_path` should be treated as scannable text: not a VCS or
/// binary-extension path, size within the cap, and no zero byte in its
/// first KiB.
pub fn is_text_file(full_path: &Path) -> bool {
    if under_hidden_vcs(full_path) || has_binary_extension(full_path) {
        return false;
    }
    let Ok(meta) = std::fs::metadata(full_path) else {
        return false;
    };
    if meta.len() > MAX_TEXT_FILE_BYTES {
        return false;
    }
    let Ok(mut file) = std::fs::File::open(full_path) else {
        return false;
    };
    use std::io::Read;
    let mut buf = vec![0u8; 1024.min(meta.len() as usize)];
    if file.read_exact(&mut buf).is_err() && !buf.is_empty() {
        // Short read on a tiny file is fine; re-check with what's available.
    }
    !buf.contains(&0)
}

/// Searches a candidate file set for evidence relevant to `query`.
pub struct CodeSearch<'a> {
    root: PathBuf,
    symbols: Option<&'a SymbolIndex>,
}

impl<'a> CodeSearch<'a> {
    /// Build a searcher rooted at `root`, optionally consulting a symbol
    /// index for definition/usage hits before falling back to a linear
    /// text scan.
    pub fn new(root: impl Into<PathBuf>, symbols: Option<&'a SymbolIndex>) -> Self {
        Self {
            root: root.into(),
            symbols,
        }
    }

    /// Search `paths` (relative to root) for `query`, returning up to
    /// `max_results` deduplicated hits.
    pub fn search(&self, query: &str, paths: &[String], max_results: usize) -> Vec<SearchHit> {
        let tokens = tokenize(query);
        if tokens.is_empty() || max_results == 0 {
            return Vec::new();
        }

        let mut hits = Vec::new();
        let mut seen: HashSet<(String, u32)> = HashSet::new();

        if let Some(symbols) = self.symbols {
            for token in &tokens {
                for (path, line) in symbols.find_definitions(token) {
                    push_unique(&mut hits, &mut seen, SearchHit::new(path, line, token.clone()));
                    if hits.len() >= max_results {
                        return hits;
                    }
                }
            }
            for token in &tokens {
                for (path, line) in symbols.find_usages(token) {
                    push_unique(&mut hits, &mut seen, SearchHit::new(path, line, token.clone()));
                    if hits.len() >= max_results {
                        return hits;
                    }
                }
            }
        }

        let mut candidates: Vec<&String> = paths.iter().collect();
        candidates.sort();
        for rel in candidates {
            let full = self.root.join(rel);
            if !is_text_file(&full) {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&full) else {
                continue;
            };
            for (idx, line) in content.lines().enumerate() {
                let lower = line.to_lowercase();
                if tokens.iter().all(|t| lower.contains(t.as_str())) {
                    let line_no = (idx + 1) as u32;
                    let snippet = line.trim().to_string();
                    push_unique(&mut hits, &mut seen, SearchHit::new(rel.clone(), line_no, snippet));
                    if hits.len() >= max_results {
                        return hits;
                    }
                }
            }
        }

        hits
    }
}

fn push_unique(hits: &mut Vec<SearchHit>, seen: &mut HashSet<(String, u32)>, hit: SearchHit) {
    let id = (hit.path.clone(), hit.line);
    if seen.insert(id) {
        hits.push(hit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn tokenize_filters_short_words() {
        let toks = tokenize("find the Delegation Policy in a repo");
        assert_eq!(
            toks,
            vec!["find", "the", "delegation", "policy", "repo"]
        );
    }

    #[test]
    fn linear_scan_requires_all_tokens_on_a_line() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.txt"),
            "delegation policy lives here\nunrelated line\n",
        )
        .unwrap();

        let search = CodeSearch::new(dir.path(), None);
        let hits = search.search("delegation policy", &["a.txt".to_string()], 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line, 1);
    }

    #[test]
    fn dedups_path_line_pairs() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "policy policy policy\n").unwrap();
        let search = CodeSearch::new(dir.path(), None);
        let hits = search.search("policy", &["a.txt".to_string()], 10);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn binary_extension_excluded() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"policy\0binary").unwrap();
        let search = CodeSearch::new(dir.path(), None);
        let hits = search.search("policy", &["a.png".to_string()], 10);
        assert!(hits.is_empty());
    }

    #[test]
    fn respects_max_results() {
        let dir = tempdir().unwrap();
        let mut content = String::new();
        for _ in 0..5 {
            content.push_str("policy match\n");
        }
        std::fs::write(dir.path().join("a.txt"), content).unwrap();
        let search = CodeSearch::new(dir.path(), None);
        let hits = search.search("policy", &["a.txt".to_string()], 2);
        assert_eq!(hits.len(), 2);
    }
}
