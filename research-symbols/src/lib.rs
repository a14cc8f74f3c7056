//! # research-symbols — the symbol index (C2)
//!
//! Walks a caller-supplied set of source files and maintains an in-memory
//! definition/usage index, keyed by a case-folded name. Per-file summaries
//! are cached in the [`research_cas::Cas`] store keyed by
//! `(file bytes, parser_version)`, so re-indexing unchanged files is a
//! cache hit rather than a re-parse.
//!
//! Definition/usage extraction here is a line-oriented heuristic scanner
//! rather than a full per-language AST walk (tree-sitter grammars are a
//! heavier dependency than this component's budget affords); it recognizes
//! common declaration keywords across the languages the rest of the
//! workspace's own source is written in, which is sufficient for the
//! retrieval evidence this index feeds into code search (C3).

use regex::Regex;
use research_cas::Cas;
use research_types::{symbol::fold_key, BlobMeta, SymbolDef, SymbolUse};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Bump this when the extraction heuristic changes, so cached summaries
/// for old extractions are not mistaken for current ones.
pub const PARSER_VERSION: &str = "symbols-v1";

/// Files larger than this are skipped rather than parsed.
pub const MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct FileSummary {
    defs: HashMap<String, Vec<u32>>,
    uses: HashMap<String, Vec<u32>>,
}

fn def_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            \b(?:fn|def|class|struct|trait|interface|impl|function|enum)\s+
            ([A-Za-z_][A-Za-z0-9_]*)
            ",
        )
        .expect("static regex is valid")
    })
}

fn ident_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("static regex is valid"))
}

/// In-memory definition/usage tables, owned for the orchestrator's
/// lifetime. Each file contributes at most once per index instance
/// (re-indexing the same path replaces its prior contribution).
#[derive(Default)]
pub struct SymbolIndex {
    defs: HashMap<String, Vec<SymbolDef>>,
    uses: HashMap<String, Vec<SymbolUse>>,
    indexed_paths: std::collections::HashSet<String>,
}

impl SymbolIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `paths`, relative to `root`, using `cas` as the summary
    /// cache. Files that fail to read, exceed [`MAX_FILE_BYTES`], or are
    /// already indexed are skipped silently.
    pub fn index_files(&mut self, cas: &Cas, root: &Path, paths: &[String]) {
        for rel in paths {
            if self.indexed_paths.contains(rel) {
                continue;
            }
            let full = root.join(rel);
            let Ok(meta) = std::fs::metadata(&full) else {
                continue;
            };
            if meta.len() > MAX_FILE_BYTES {
                continue;
            }
            let Ok(bytes) = std::fs::read(&full) else {
                continue;
            };
            let summary = self.summary_for(cas, &bytes);
            self.merge_summary(rel, summary);
            self.indexed_paths.insert(rel.clone());
        }
    }

    fn summary_for(&self, cas: &Cas, bytes: &[u8]) -> FileSummary {
        let digest = research_cas::hash_content(bytes);
        let key = research_types::BlobKey::new(&digest, PARSER_VERSION);
        if let (Some(cached), Some(_)) = cas.get(&key) {
            if let Ok(summary) = serde_json::from_slice::<FileSummary>(&cached) {
                return summary;
            }
        }
        let text = String::from_utf8_lossy(bytes);
        let summary = extract_summary(&text);
        if let Ok(serialized) = serde_json::to_vec(&summary) {
            let meta = BlobMeta::local(serialized.len() as u64, PARSER_VERSION);
            let _ = cas.put(&serialized, meta);
        }
        summary
    }

    fn merge_summary(&mut self, path: &str, summary: FileSummary) {
        for (name, lines) in summary.defs {
            let key = fold_key(&name);
            let entry = self.defs.entry(key).or_default();
            for line in lines {
                entry.push(SymbolDef {
                    name: name.clone(),
                    path: path.to_string(),
                    line,
                });
            }
        }
        for (name, lines) in summary.uses {
            let key = fold_key(&name);
            let entry = self.uses.entry(key).or_default();
            for line in lines {
                entry.push(SymbolUse {
                    name: name.clone(),
                    path: path.to_string(),
                    line,
                });
            }
        }
    }

    /// Find all definitions of `name` (case-insensitive), in insertion
    /// order.
    pub fn find_definitions(&self, name: &str) -> Vec<(String, u32)> {
        self.defs
            .get(&fold_key(name))
            .map(|v| v.iter().map(|d| (d.path.clone(), d.line)).collect())
            .unwrap_or_default()
    }

    /// Find all usages of `name` (case-insensitive), in insertion order.
    pub fn find_usages(&self, name: &str) -> Vec<(String, u32)> {
        self.uses
            .get(&fold_key(name))
            .map(|v| v.iter().map(|u| (u.path.clone(), u.line)).collect())
            .unwrap_or_default()
    }
}

/// The blob stored in the CAS for a file's summary, used as the unit that
/// deserializes back into `FileSummary`.
fn extract_summary(text: &str) -> FileSummary {
    let mut defs: HashMap<String, Vec<u32>> = HashMap::new();
    let mut uses: HashMap<String, Vec<u32>> = HashMap::new();
    let mut defined_lines: HashMap<u32, String> = HashMap::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        if let Some(caps) = def_regex().captures(line) {
            let name = caps[1].to_string();
            defs.entry(name.clone()).or_default().push(line_no);
            defined_lines.insert(line_no, name);
        }
        for m in ident_regex().find_iter(line) {
            let word = m.as_str();
            if is_definition_token(word) {
                continue;
            }
            if defined_lines.get(&line_no).map(|d| d.as_str()) == Some(word) {
                continue;
            }
            uses.entry(word.to_string()).or_default().push(line_no);
        }
    }

    FileSummary { defs, uses }
}

fn is_definition_token(word: &str) -> bool {
    matches!(
        word,
        "fn" | "def" | "class" | "struct" | "trait" | "interface" | "impl" | "function" | "enum"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn indexes_definition_and_usage() {
        let dir = tempdir().unwrap();
        let cas = Cas::open(dir.path().join("cas")).unwrap();
        std::fs::write(
            dir.path().join("policy.py"),
            "class DelegationPolicy:\n    pass\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("orch.py"),
            "from policy import DelegationPolicy\nDelegationPolicy()\n",
        )
        .unwrap();

        let mut idx = SymbolIndex::new();
        idx.index_files(
            &cas,
            dir.path(),
            &["policy.py".to_string(), "orch.py".to_string()],
        );

        let defs = idx.find_definitions("delegationpolicy");
        assert_eq!(defs, vec![("policy.py".to_string(), 1)]);

        let uses = idx.find_usages("DelegationPolicy");
        assert!(uses.contains(&("orch.py".to_string(), 1)));
        assert!(uses.contains(&("orch.py".to_string(), 2)));
    }

    #[test]
    fn reindexing_same_file_is_idempotent() {
        let dir = tempdir().unwrap();
        let cas = Cas::open(dir.path().join("cas")).unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn widget() {}\n").unwrap();

        let mut idx = SymbolIndex::new();
        idx.index_files(&cas, dir.path(), &["a.rs".to_string()]);
        idx.index_files(&cas, dir.path(), &["a.rs".to_string()]);

        assert_eq!(idx.find_definitions("widget").len(), 1);
    }

    #[test]
    fn oversized_file_is_skipped() {
        let dir = tempdir().unwrap();
        let cas = Cas::open(dir.path().join("cas")).unwrap();
        let big = vec![b'x'; (MAX_FILE_BYTES + 1) as usize];
        std::fs::write(dir.path().join("big.txt"), &big).unwrap();

        let mut idx = SymbolIndex::new();
        idx.index_files(&cas, dir.path(), &["big.txt".to_string()]);
        assert!(idx.find_definitions("x").is_empty());
    }
}
