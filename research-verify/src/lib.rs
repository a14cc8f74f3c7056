//! # research-verify — the verifier gate (C8)
//!
//! Admits or rejects a proposed claim based on citation count, source
//! independence, and (optionally) semantic support from a configured
//! [`RemoteReasoner`]. Rules apply in order; any failure short-circuits
//! to `verified=false, confidence=0.2`. A claim passing all three is
//! admitted at `confidence=0.8`.

use regex::Regex;
use research_types::{Claim, RemoteReasoner};
use std::sync::{Arc, OnceLock};

/// Extracts `<path>:<line>` citation references from free-form observation
/// text. Generalizes the original's `.py`/`.md`/`.json`-only pattern to
/// any repository-relative path (spec.md §9 open question, resolved here
/// per the spec's directive).
pub fn citation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?P<path>[\w./\-]+):(?P<line>\d+)").expect("static regex is valid")
    })
}

/// Extract every `<path>:<line>` citation found in `text`, in order of
/// appearance.
pub fn extract_citations(text: &str) -> Vec<String> {
    citation_regex()
        .captures_iter(text)
        .map(|c| format!("{}:{}", &c["path"], &c["line"]))
        .collect()
}

fn is_url(source: &str) -> bool {
    source.contains("://")
}

fn url_host(source: &str) -> &str {
    let after_scheme = source.splitn(2, "://").nth(1).unwrap_or(source);
    after_scheme.split(['/', '?', '#']).next().unwrap_or(after_scheme)
}

/// A single encoded source that names both a definition and a usage site
/// in one local citation, e.g. `"src/policy.py:10:42"` — at least two
/// colon separators and no URL scheme.
fn is_def_usage_pair(sources: &[String]) -> bool {
    sources.len() == 1 && !is_url(&sources[0]) && sources[0].matches(':').count() >= 2
}

/// The local-file identity of a `path` or `path:line` source: the path
/// with any trailing `:<digits>` line suffix stripped.
fn local_file_identity(source: &str) -> &str {
    match source.rfind(':') {
        Some(idx) if source[idx + 1..].chars().all(|c| c.is_ascii_digit()) && idx + 1 < source.len() => {
            &source[..idx]
        }
        _ => source,
    }
}

fn origin(source: &str) -> String {
    if is_url(source) {
        url_host(source).to_string()
    } else {
        local_file_identity(source).to_string()
    }
}

fn distinct_origin_count(sources: &[String]) -> usize {
    let mut origins: Vec<String> = sources.iter().map(|s| origin(s)).collect();
    origins.sort();
    origins.dedup();
    origins.len()
}

fn citation_count_passes(sources: &[String]) -> bool {
    sources.len() >= 2 || is_def_usage_pair(sources)
}

fn independence_passes(sources: &[String]) -> bool {
    is_def_usage_pair(sources) || distinct_origin_count(sources) >= 2
}

/// The verifier gate.
pub struct VerifierGate {
    reasoner: Option<Arc<dyn RemoteReasoner>>,
}

impl VerifierGate {
    /// Build a gate with no semantic-support reasoner; rule 3 always
    /// falls back to its local heuristic.
    pub fn local_only() -> Self {
        Self { reasoner: None }
    }

    /// Build a gate that consults `reasoner` for semantic support.
    pub fn with_reasoner(reasoner: Arc<dyn RemoteReasoner>) -> Self {
        Self {
            reasoner: Some(reasoner),
        }
    }

    /// Verify `text` against `sources`, applying the three rules in
    /// order.
    pub async fn verify_claim(&self, text: &str, sources: Vec<String>) -> Claim {
        if !citation_count_passes(&sources) {
            tracing::debug!(rule = "citation_count", "verifier: claim rejected");
            return Claim::rejected(text, sources);
        }
        if !independence_passes(&sources) {
            tracing::debug!(rule = "independence", "verifier: claim rejected");
            return Claim::rejected(text, sources);
        }

        let semantic_ok = match &self.reasoner {
            Some(reasoner) => {
                let question = format!(
                    "Do these sources support the claim \"{text}\"? Sources: {}",
                    sources.join(", ")
                );
                match reasoner.ask_yes_no(&question).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        tracing::warn!(error = %e, "verifier: reasoner call failed, falling back to local heuristic");
                        fallback_semantic_support(&sources)
                    }
                }
            }
            None => fallback_semantic_support(&sources),
        };

        if !semantic_ok {
            tracing::debug!(rule = "semantic_support", "verifier: claim rejected");
            return Claim::rejected(text, sources);
        }

        Claim::admitted(text, sources)
    }
}

fn fallback_semantic_support(sources: &[String]) -> bool {
    sources.iter().filter(|s| !s.is_empty()).count() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn two_distinct_files_verify() {
        let gate = VerifierGate::local_only();
        let claim = gate
            .verify_claim(
                "DelegationPolicy is defined and used",
                vec!["src/policy.py:10".into(), "src/orch.py:42".into()],
            )
            .await;
        assert!(claim.verified);
        assert_eq!(claim.confidence, 0.8);
    }

    #[tokio::test]
    async fn single_plain_source_is_rejected() {
        let gate = VerifierGate::local_only();
        let claim = gate
            .verify_claim("system is fast", vec!["src/x.py:1".into()])
            .await;
        assert!(!claim.verified);
        assert_eq!(claim.confidence, 0.2);
    }

    #[tokio::test]
    async fn same_file_twice_is_not_independent() {
        let gate = VerifierGate::local_only();
        let claim = gate
            .verify_claim("claim", vec!["src/a.py:1".into(), "src/a.py:2".into()])
            .await;
        assert!(!claim.verified);
    }

    #[tokio::test]
    async fn def_usage_pair_single_source_passes_citation_and_independence_but_not_semantic() {
        let gate = VerifierGate::local_only();
        let claim = gate
            .verify_claim("claim", vec!["src/a.py:1:5".into()])
            .await;
        // Rules 1 and 2 pass via the def/usage-pair special case, but rule 3
        // with no reasoner falls back to `fallback_semantic_support`, which
        // requires at least two sources — a lone source never clears it.
        assert!(!claim.verified);
        assert_eq!(claim.confidence, 0.2);
    }

    #[tokio::test]
    async fn two_distinct_urls_are_independent() {
        let gate = VerifierGate::local_only();
        let claim = gate
            .verify_claim(
                "claim",
                vec!["https://a.org/paper".into(), "https://b.org/paper".into()],
            )
            .await;
        assert!(claim.verified);
    }

    #[tokio::test]
    async fn same_host_different_paths_not_independent() {
        let gate = VerifierGate::local_only();
        let claim = gate
            .verify_claim(
                "claim",
                vec!["https://a.org/one".into(), "https://a.org/two".into()],
            )
            .await;
        assert!(!claim.verified);
    }

    #[test]
    fn extract_citations_generalizes_beyond_original_extensions() {
        let text = "see src/lib.rs:10 and docs/readme.txt:3 for details";
        let citations = extract_citations(text);
        assert_eq!(citations, vec!["src/lib.rs:10".to_string(), "docs/readme.txt:3".to_string()]);
    }
}
