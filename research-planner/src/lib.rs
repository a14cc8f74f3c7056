//! # research-planner — the adaptive planner (C9)
//!
//! Walks a repository root once to build a [`ManifestEntry`] list, then
//! partitions that manifest into an ordered, deterministic [`PlanStage`]
//! list: a zero-path `manifest` stage documenting the scan itself, a
//! high-signal `tier1` stage, and a catch-all `tier2` stage.

use ignore::WalkBuilder;
use research_types::{ManifestEntry, PlanStage};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Top-level directories treated as high-signal (tier1).
pub const HIGH_SIGNAL_DIRS: &[&str] = &["src", "schemas", "docs"];

/// Walk `root` once, producing a manifest. Any I/O error encountered
/// while stat-ing a path drops that path from the manifest; the walk
/// itself never aborts on a per-entry failure.
pub fn build_manifest(root: &Path) -> Vec<ManifestEntry> {
    let mut entries = Vec::new();
    let walker = WalkBuilder::new(root).hidden(false).build();
    for result in walker {
        let Ok(entry) = result else { continue };
        if entry.file_type().map(|t| !t.is_file()).unwrap_or(true) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let Ok(meta) = entry.metadata() else { continue };
        let mtime = meta
            .modified()
            .ok()
            .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        entries.push(ManifestEntry::new(
            rel.to_string_lossy().replace('\\', "/"),
            meta.len(),
            mtime,
        ));
    }
    entries
}

/// Build the deterministic three-stage plan for `entries`.
pub fn plan_stages(entries: &[ManifestEntry], base_concurrency: usize) -> Vec<PlanStage> {
    let mut tier1 = Vec::new();
    let mut tier2 = Vec::new();

    for entry in entries {
        match entry.top_level_dir() {
            Some(dir) if HIGH_SIGNAL_DIRS.contains(&dir) => tier1.push(entry.path.clone()),
            _ => tier2.push(entry.path.clone()),
        }
    }

    let tier1_cap = (base_concurrency.min(4.max(tier1.len() / 8))).max(4);
    let tier2_cap = (tier1_cap / 2).max(2);

    vec![
        PlanStage::new("manifest", Vec::new(), 0, "filesystem scan, metadata only"),
        PlanStage::new(
            "tier1",
            tier1,
            tier1_cap,
            "high-signal directories: src, schemas, docs",
        ),
        PlanStage::new("tier2", tier2, tier2_cap, "remaining paths"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use research_types::ManifestEntry;
    use tempfile::tempdir;

    fn entries(paths: &[&str]) -> Vec<ManifestEntry> {
        paths.iter().map(|p| ManifestEntry::new(*p, 10, 0)).collect()
    }

    #[test]
    fn stage_ordering_is_manifest_then_tier1_then_tier2() {
        let stages = plan_stages(&entries(&["src/a.py", "docs/b.md", "LICENSE", "tools/c.go"]), 16);
        assert_eq!(stages[0].name, "manifest");
        assert_eq!(stages[1].name, "tier1");
        assert_eq!(stages[2].name, "tier2");
    }

    #[test]
    fn tier_assignment_matches_high_signal_dirs() {
        let stages = plan_stages(&entries(&["src/a.py", "docs/b.md", "LICENSE", "tools/c.go"]), 16);
        assert_eq!(stages[1].paths, vec!["docs/b.md".to_string(), "src/a.py".to_string()]);
        assert_eq!(stages[2].paths, vec!["LICENSE".to_string(), "tools/c.go".to_string()]);
    }

    #[test]
    fn manifest_stage_has_no_paths_and_concurrency_zero() {
        let stages = plan_stages(&entries(&[]), 16);
        assert!(stages[0].is_empty());
        assert_eq!(stages[0].max_concurrency, 0);
    }

    #[test]
    fn non_empty_stage_concurrency_is_at_least_one() {
        let stages = plan_stages(&entries(&["src/a.py"]), 16);
        assert!(stages[1].max_concurrency >= 1);
        let empty_tier2 = entries(&["src/a.py"]);
        let stages2 = plan_stages(&empty_tier2, 16);
        // tier2 empty here; concurrency may be >=1 even though unused, that's fine.
        assert!(stages2[2].max_concurrency >= 1);
    }

    #[test]
    fn build_manifest_drops_nothing_on_empty_dir_and_skips_subdirs() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.rs"), b"fn main() {}").unwrap();
        std::fs::write(dir.path().join("LICENSE"), b"MIT").unwrap();

        let manifest = build_manifest(dir.path());
        let paths: Vec<&str> = manifest.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"src/a.rs"));
        assert!(paths.contains(&"LICENSE"));
    }
}
