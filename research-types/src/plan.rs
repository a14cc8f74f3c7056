//! Execution stages emitted by the adaptive planner.

use serde::{Deserialize, Serialize};

/// One stage of an execution plan. Stages form an ordered list; `paths`
/// within a stage are sorted lexicographically so that plans are
/// deterministic for a fixed manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStage {
    /// Stage name (`"manifest"`, `"tier1"`, `"tier2"`, ...).
    pub name: String,
    /// Paths assigned to this stage, lexicographically sorted.
    pub paths: Vec<String>,
    /// Upper bound on parallel tool dispatch within this stage.
    /// Must be `>= 1` for a non-empty stage; `0` is only valid when
    /// `paths` is empty.
    pub max_concurrency: usize,
    /// Free-form annotation describing why the stage was built this way.
    pub notes: String,
}

impl PlanStage {
    /// Construct a stage, sorting `paths` lexicographically.
    pub fn new(
        name: impl Into<String>,
        mut paths: Vec<String>,
        max_concurrency: usize,
        notes: impl Into<String>,
    ) -> Self {
        paths.sort();
        Self {
            name: name.into(),
            paths,
            max_concurrency,
            notes: notes.into(),
        }
    }

    /// Whether this stage carries no paths (e.g. the manifest-scan stage).
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sorts_paths() {
        let stage = PlanStage::new("tier2", vec!["b.rs".into(), "a.rs".into()], 2, "");
        assert_eq!(stage.paths, vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn empty_stage_reports_empty() {
        let stage = PlanStage::new("manifest", vec![], 0, "scan phase");
        assert!(stage.is_empty());
    }
}
