//! # research-drift — the drift monitor (C12)
//!
//! Measures cosine similarity between successive compressed reports as a
//! bag-of-word vector and turns the result into a compression/verification
//! advisory the orchestrator can act on between stages.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Similarity below this value is a danger tick: tighten compression,
/// raise the verifier's citation bar, and shrink concurrency.
pub const DEFAULT_DANGER_THRESHOLD: f64 = 0.95;
/// Similarity below this value (but at or above danger) is a warn tick.
pub const DEFAULT_WARN_THRESHOLD: f64 = 0.98;

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_]+").expect("static regex is valid"))
}

fn bag_of_words(text: &str) -> HashMap<String, u32> {
    let lower = text.to_lowercase();
    let mut counts = HashMap::new();
    for tok in token_regex().find_iter(&lower) {
        *counts.entry(tok.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}

fn cosine(a: &HashMap<String, u32>, b: &HashMap<String, u32>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    for (k, &va) in a {
        if let Some(&vb) = b.get(k) {
            dot += va as f64 * vb as f64;
        }
    }
    let norm_a = (a.values().map(|&v| (v as f64) * (v as f64)).sum::<f64>()).sqrt();
    let norm_b = (b.values().map(|&v| (v as f64) * (v as f64)).sum::<f64>()).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// One drift measurement between a stage's previous and current report.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftTick {
    pub step: u64,
    pub cosine_sim: f64,
    pub drift_rate: f64,
    pub action: String,
}

/// Tracks successive-report drift and produces advisories.
pub struct DriftMonitor {
    warn: f64,
    danger: f64,
}

impl Default for DriftMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_THRESHOLD, DEFAULT_DANGER_THRESHOLD)
    }
}

impl DriftMonitor {
    pub fn new(warn_threshold: f64, danger_threshold: f64) -> Self {
        Self {
            warn: warn_threshold,
            danger: danger_threshold,
        }
    }

    /// Compute the drift tick for `step` comparing `prev_report` to
    /// `curr_report`.
    pub fn measure(&self, step: u64, prev_report: &str, curr_report: &str) -> DriftTick {
        let a = bag_of_words(prev_report);
        let b = bag_of_words(curr_report);
        let sim = cosine(&a, &b);
        let drift_rate = 1.0 - sim;
        let action = if sim < self.danger {
            "increase_compression;raise_verify_k;reduce_concurrency"
        } else if sim < self.warn {
            "increase_compression_slight;prefer_high_authority_sources"
        } else {
            "stable"
        };
        if action != "stable" {
            tracing::info!(step, cosine_sim = sim, action, "drift monitor advisory");
        }
        DriftTick {
            step,
            cosine_sim: sim,
            drift_rate,
            action: action.to_string(),
        }
    }
}
