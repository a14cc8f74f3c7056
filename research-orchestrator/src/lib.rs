//! # research-orchestrator — the Markov loop (C10)
//!
//! Drives the question → plan → search → verify → compress cycle described
//! by the adaptive planner (C9), code search (C3), delegation policy (C7),
//! and verifier gate (C8), carrying only [`LoopState`] across stages.
//!
//! Two execution modes exist:
//!
//! - **Local-evidence mode**: walks the plan's stages in order, gathering
//!   and verifying citations with no reasoner involved. Always available.
//! - **Reasoner-driven mode**: alternates messages with a configured
//!   [`RemoteReasoner`], dispatching whatever tool call its reply yields
//!   (parsed by research-react in the priority order spec.md §4.10
//!   describes) until it produces a verified final answer or the iteration
//!   cap is reached. Falls back to local-evidence mode the moment the
//!   reasoner proves unconfigured or unreachable — the run never fails
//!   just because the network path is unavailable.
//!
//! No module-level singletons: every collaborator (tool registry, policy,
//! verifier, reasoner) is threaded through explicitly via [`Environment`],
//! built once by the composition root (`research-cli`).

mod router;

pub use router::ModelRouter;

use research_drift::DriftMonitor;
use research_policy::DelegationPolicy;
use research_tools::ToolRegistry;
use research_types::{
    Claim, LoopState, ReasonerError, ReasonerReply, ReasonerToolCall, RemoteReasoner, SearchHit,
    ToolCall,
};
use research_verify::VerifierGate;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// The hard-failure subset of spec.md §7's error taxonomy. Tool/budget/
/// timeout/network/verification outcomes are all localized inside the
/// loop (see module docs); only configuration problems and invariant
/// violations ever reach the caller.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RunError {
    /// Required credential or configuration missing at startup.
    #[error("configuration error: {0}")]
    ConfigError(String),
    /// An unrecoverable programming invariant was violated.
    #[error("fatal error: {0}")]
    FatalError(String),
    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Delegation-policy role names. A named reasoner or tool is billed
/// against one of these budgets before its output may enter the report.
pub const ROLE_SMALL: &str = "small";
/// The primary reasoner's delegation role (named `tongyi` after the
/// original's default provider, kept as the role name since it identifies
/// a budget, not a vendor).
pub const ROLE_PRIMARY: &str = "tongyi";
pub const ROLE_SANDBOX: &str = "sandbox";
pub const ROLE_SCHOLAR: &str = "scholar";
pub const ROLE_CSV_CLEANER: &str = "csv_cleaner";
pub const ROLE_MD_CLEANER: &str = "md_cleaner";
/// The role billed for local evidence (tool output merged into the report
/// during plan-stage execution), so that path is also budget-governed
/// (spec.md §9: all tool output passes through delegation compression
/// before entering `R_t`).
pub const ROLE_EVIDENCE: &str = "evidence_merge";

/// Default `(role, max_calls, max_tokens)` budgets. The composition root
/// registers these (or its own tuning) on the [`DelegationPolicy`] it
/// builds before constructing an [`Environment`].
pub fn default_role_budgets() -> Vec<(&'static str, u64, u64)> {
    vec![
        (ROLE_SMALL, 40, 20_000),
        (ROLE_PRIMARY, 20, 20_000),
        (ROLE_SANDBOX, 10, 8_000),
        (ROLE_SCHOLAR, 10, 8_000),
        (ROLE_CSV_CLEANER, 10, 8_000),
        (ROLE_MD_CLEANER, 10, 8_000),
        (ROLE_EVIDENCE, 64, 40_000),
    ]
}

/// Register [`default_role_budgets`] on `policy`.
pub fn register_default_roles(policy: &DelegationPolicy) {
    for (role, max_calls, max_tokens) in default_role_budgets() {
        policy.register(role, max_calls, max_tokens);
    }
}

fn role_for_tool(tool_name: &str) -> &'static str {
    match tool_name {
        "run_sandbox" => ROLE_SANDBOX,
        "search_papers" => ROLE_SCHOLAR,
        "clean_csv" => ROLE_CSV_CLEANER,
        "clean_markdown" => ROLE_MD_CLEANER,
        _ => ROLE_SMALL,
    }
}

/// The explicit, no-globals composition of everything the orchestrator
/// needs for a run.
pub struct Environment {
    pub root: PathBuf,
    pub tools: Arc<ToolRegistry>,
    pub policy: Arc<DelegationPolicy>,
    pub verifier: Arc<VerifierGate>,
    pub reasoner: Option<Arc<dyn RemoteReasoner>>,
    pub router: Option<ModelRouter>,
    /// Base concurrency fed to the planner's `plan_stages`.
    pub base_concurrency: usize,
    /// Maximum total tool/reasoner calls per question.
    pub iteration_cap: u64,
    /// Token cap (whitespace-split proxy) on the running report.
    pub report_token_cap: usize,
}

impl Environment {
    /// Build a local-only environment: no reasoner configured.
    pub fn local_only(
        root: impl Into<PathBuf>,
        tools: Arc<ToolRegistry>,
        policy: Arc<DelegationPolicy>,
        verifier: Arc<VerifierGate>,
    ) -> Self {
        Self {
            root: root.into(),
            tools,
            policy,
            verifier,
            reasoner: None,
            router: None,
            base_concurrency: 16,
            iteration_cap: 20,
            report_token_cap: 800,
        }
    }

    /// Attach a reasoner and model router, enabling reasoner-driven mode.
    pub fn with_reasoner(mut self, reasoner: Arc<dyn RemoteReasoner>, router: ModelRouter) -> Self {
        self.reasoner = Some(reasoner);
        self.router = Some(router);
        self
    }
}

/// How many search hits a plan stage's own paths are searched for before
/// falling back to a repo-wide search.
const STAGE_SEARCH_CAP: usize = 4;
/// Cap applied to the repo-wide fallback search.
const FALLBACK_SEARCH_CAP: usize = 4;
/// Snippets longer than this are elided with a trailing marker.
const MAX_SNIPPET_LEN: usize = 160;
const ELISION_MARKER: &str = "…";
/// Minimum number of distinct verified citations admitted into the report
/// before the loop considers itself done. Deliberately not the original's
/// "5 occurrences of the word 'file'" placeholder (spec.md §9) — citation
/// count is the quantity the verifier gate actually governs.
const SUFFICIENCY_CITATION_COUNT: usize = 2;

fn elide(snippet: &str, max_len: usize) -> String {
    if snippet.chars().count() <= max_len {
        return snippet.to_string();
    }
    let truncated: String = snippet.chars().take(max_len).collect();
    format!("{truncated}{ELISION_MARKER}")
}

/// Keep only the last `cap` whitespace-split tokens of `report`, so the
/// freshest admitted evidence survives truncation rather than the oldest.
fn cap_report(report: &str, cap: usize) -> String {
    let tokens: Vec<&str> = report.split_whitespace().collect();
    if tokens.len() <= cap {
        return report.trim().to_string();
    }
    tokens[tokens.len() - cap..].join(" ")
}

fn append_report(report: &str, addition: &str, cap: usize) -> String {
    if addition.trim().is_empty() {
        return report.to_string();
    }
    let combined = if report.is_empty() {
        addition.to_string()
    } else {
        format!("{report} {addition}")
    };
    cap_report(&combined, cap)
}

fn default_sufficiency(report: &str) -> bool {
    report.matches('[').count() >= SUFFICIENCY_CITATION_COUNT
}

/// Drives the loop described in the module docs.
pub struct Orchestrator {
    env: Environment,
}

enum Degrade {
    ToLocal,
    Fatal(RunError),
}

impl Orchestrator {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Run the full loop for `question`, returning the synthesized answer.
    pub async fn run(&self, question: &str) -> Result<String, RunError> {
        if let Some(reasoner) = self.env.reasoner.clone() {
            match self.run_reasoner_driven(question, reasoner.as_ref()).await {
                Ok(answer) => return Ok(answer),
                Err(Degrade::ToLocal) => {
                    tracing::info!("reasoner path unavailable, degrading to local-evidence mode");
                }
                Err(Degrade::Fatal(e)) => return Err(e),
            }
        }
        let state = self.run_local(question).await;
        Ok(self.synthesize(&state))
    }

    async fn search_stage(&self, question: &str, paths: &[String], max_results: usize) -> Vec<SearchHit> {
        let call = ToolCall::new(
            "search_code",
            json!({"query": question, "paths": paths, "max_results": max_results}),
        );
        let result = self.env.tools.execute(call).await;
        match result.result {
            Some(value) => serde_json::from_value(value).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Walk the plan stages in order, gathering and verifying citations
    /// with no reasoner involved.
    async fn run_local(&self, question: &str) -> LoopState {
        let mut state = LoopState::new(question);
        let entries = research_planner::build_manifest(&self.env.root);
        let stages = research_planner::plan_stages(&entries, self.env.base_concurrency);
        let drift = DriftMonitor::default();
        let mut prev_report = String::new();
        let mut step = 0u64;

        for stage in &stages {
            step += 1;
            if stage.name == "manifest" {
                state.last_observation =
                    format!("manifest scan found {} files across {} stages", entries.len(), stages.len());
                continue;
            }

            let mut hits = self.search_stage(question, &stage.paths, STAGE_SEARCH_CAP).await;
            if hits.is_empty() {
                let all_paths: Vec<String> = entries.iter().map(|e| e.path.clone()).collect();
                hits = self.search_stage(question, &all_paths, FALLBACK_SEARCH_CAP).await;
            }
            if hits.is_empty() {
                continue;
            }
            hits.sort_by(|a, b| a.path.cmp(&b.path).then(a.line.cmp(&b.line)));

            let lines: Vec<String> = hits
                .iter()
                .map(|h| format!("{}:{} {}", h.path, h.line, elide(&h.snippet, MAX_SNIPPET_LEN)))
                .collect();
            let proposed = lines.join("\n");
            state.last_observation = proposed.clone();

            let sources = research_verify::extract_citations(&proposed);
            let claim: Claim = self.env.verifier.verify_claim(&proposed, sources).await;

            if claim.verified {
                let with_citation = format!("{proposed} [{}]", claim.sources.join(", "));
                if let Some(compressed) = self.env.policy.record(ROLE_EVIDENCE, &with_citation) {
                    state.report = append_report(&state.report, &compressed, self.env.report_token_cap);
                }
            }

            let tick = drift.measure(step, &prev_report, &state.report);
            prev_report = state.report.clone();
            if tick.action != "stable" {
                tracing::info!(step, action = %tick.action, "drift advisory");
            }

            if default_sufficiency(&state.report) {
                break;
            }
        }

        state
    }

    fn parse_tool_call(reply: &ReasonerReply) -> Option<ReasonerToolCall> {
        match reply {
            ReasonerReply::ToolCalls(calls) => calls.first().cloned(),
            ReasonerReply::Text(text) => research_react::parse_json_tool_call(text)
                .and_then(|block| {
                    block.action.map(|name| ReasonerToolCall {
                        name,
                        parameters: block.action_input.unwrap_or_else(|| json!({})),
                    })
                })
                .or_else(|| {
                    research_react::parse_blocks(text).into_iter().find_map(|block| {
                        block.action.map(|name| ReasonerToolCall {
                            name,
                            parameters: block.action_input.unwrap_or_else(|| json!({})),
                        })
                    })
                }),
        }
    }

    async fn run_reasoner_driven(
        &self,
        question: &str,
        reasoner: &dyn RemoteReasoner,
    ) -> Result<String, Degrade> {
        let mut state = LoopState::new(question);
        let schemas = self.env.tools.list();
        let schema_text = serde_json::to_string(&schemas).unwrap_or_default();
        let mut prompt = format!(
            "Question: {question}\nAvailable tools: {schema_text}\nRespond with a tool call or a final answer."
        );
        let mut iterations = 0u64;

        while iterations < self.env.iteration_cap {
            iterations += 1;
            let model = self
                .env
                .router
                .as_ref()
                .map(|r| r.next_model())
                .unwrap_or_else(|| "default".to_string());

            let reply = match reasoner.chat(&prompt, &model).await {
                Ok(reply) => reply,
                Err(ReasonerError::NotConfigured(_)) => return Err(Degrade::ToLocal),
                Err(e) => {
                    tracing::warn!(error = %e, "reasoner call failed, degrading to local-evidence mode");
                    return Err(Degrade::ToLocal);
                }
            };

            match Self::parse_tool_call(&reply) {
                Some(call) => {
                    let role = role_for_tool(&call.name);
                    if !self.env.policy.allow(role) {
                        prompt.push_str("\nObservation: delegation budget exhausted for this tool");
                        continue;
                    }
                    let result = self
                        .env
                        .tools
                        .execute(ToolCall::new(call.name.clone(), call.parameters))
                        .await;
                    let raw = serde_json::to_string(&result).unwrap_or_default();
                    state.last_observation = raw.clone();
                    let compressed = self.env.policy.record(role, &raw).unwrap_or_default();
                    state.report = append_report(&state.report, &compressed, self.env.report_token_cap);
                    prompt.push_str(&format!("\nObservation: {compressed}"));
                }
                None => {
                    let text = match &reply {
                        ReasonerReply::Text(t) => t.clone(),
                        ReasonerReply::ToolCalls(_) => String::new(),
                    };
                    if let Some(answer) = research_react::extract_final_answer(&text) {
                        let sources = research_verify::extract_citations(&answer);
                        let claim = self.env.verifier.verify_claim(&answer, sources.clone()).await;
                        state.report = append_report(&state.report, &answer, self.env.report_token_cap);
                        if claim.verified || sources.is_empty() {
                            return Ok(self.synthesize(&state));
                        }
                        prompt.push_str("\nObservation: final answer lacked sufficient independent citations, continue gathering evidence");
                    } else {
                        prompt.push_str("\nObservation: no action or final answer recognized, try again");
                    }
                }
            }
        }

        Ok(self.synthesize(&state))
    }

    /// Assemble the final answer from the question, report, and last
    /// observation. Always produces an answer, even with an empty report —
    /// the user-visible failure behavior guarantee from spec.md §7.
    fn synthesize(&self, state: &LoopState) -> String {
        if state.report.is_empty() {
            format!(
                "Question: {}\nNo verified evidence was gathered. Last observation: {}",
                state.question, state.last_observation
            )
        } else {
            format!(
                "Question: {}\nFindings: {}\nLast observation: {}",
                state.question, state.report, state.last_observation
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use research_cas::Cas;
    use research_search::CodeSearch;
    use research_symbols::SymbolIndex;
    use research_tools::builtin::SearchCodeTool;
    use research_types::{NullReasoner, ReasonerError};
    use std::sync::RwLock;
    use tempfile::tempdir;

    fn build_registry(root: &std::path::Path) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SearchCodeTool::new(root, None)));
        Arc::new(registry)
    }

    fn build_env(root: &std::path::Path) -> Environment {
        let policy = Arc::new(DelegationPolicy::new());
        register_default_roles(&policy);
        Environment::local_only(
            root,
            build_registry(root),
            policy,
            Arc::new(VerifierGate::local_only()),
        )
    }

    #[tokio::test]
    async fn local_only_answer_cites_definition_and_usage() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/policy.py"),
            "line one\nclass DelegationPolicy:\n    pass\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("src/orch.py"),
            "line one\nline two\nline three\nDelegationPolicy() # uses the policy\n",
        )
        .unwrap();

        let env = build_env(dir.path());
        let orchestrator = Orchestrator::new(env);
        let answer = orchestrator.run("delegation policy").await.unwrap();
        assert!(answer.contains("policy.py") || answer.contains("No verified evidence"));
    }

    #[tokio::test]
    async fn run_never_fails_on_empty_repository() {
        let dir = tempdir().unwrap();
        let env = build_env(dir.path());
        let orchestrator = Orchestrator::new(env);
        let answer = orchestrator.run("anything").await.unwrap();
        assert!(answer.contains("Question: anything"));
    }

    #[tokio::test]
    async fn null_reasoner_degrades_to_local_mode_without_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "policy line\n").unwrap();
        let mut env = build_env(dir.path());
        env.reasoner = Some(Arc::new(NullReasoner));
        env.router = Some(ModelRouter::new("primary", "fallback", 3));
        let orchestrator = Orchestrator::new(env);
        let answer = orchestrator.run("policy").await.unwrap();
        assert!(answer.starts_with("Question: policy"));
    }

    struct OneShotReasoner;

    #[async_trait]
    impl RemoteReasoner for OneShotReasoner {
        async fn chat(&self, prompt: &str, _model: &str) -> Result<ReasonerReply, ReasonerError> {
            if prompt.contains("Observation:") {
                Ok(ReasonerReply::Text(
                    "Final answer based on a.txt:1 and b.txt:1 confirming the policy exists and is used consistently across the module boundary.".to_string(),
                ))
            } else {
                Ok(ReasonerReply::Text(
                    r#"{"tool": "search_code", "parameters": {"query": "policy"}}"#.to_string(),
                ))
            }
        }

        async fn ask_yes_no(&self, _question: &str) -> Result<bool, ReasonerError> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn reasoner_driven_mode_dispatches_json_tool_call_then_answers() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "policy line one\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "policy line two\n").unwrap();
        let mut env = build_env(dir.path());
        env.reasoner = Some(Arc::new(OneShotReasoner));
        env.router = Some(ModelRouter::new("primary", "fallback", 5));
        let orchestrator = Orchestrator::new(env);
        let answer = orchestrator.run("policy").await.unwrap();
        assert!(answer.contains("Final answer") || answer.contains("a.txt"));
    }

    #[test]
    fn elide_adds_marker_only_past_cap() {
        let short = elide("short line", MAX_SNIPPET_LEN);
        assert_eq!(short, "short line");
        let long = "x".repeat(200);
        let elided = elide(&long, MAX_SNIPPET_LEN);
        assert!(elided.ends_with(ELISION_MARKER));
        assert_eq!(elided.chars().count(), MAX_SNIPPET_LEN + ELISION_MARKER.chars().count());
    }

    #[test]
    fn cap_report_keeps_most_recent_tokens() {
        let report = "one two three four five";
        let capped = cap_report(report, 2);
        assert_eq!(capped, "four five");
    }

    #[test]
    fn symbol_backed_search_still_respects_tool_contract() {
        // Sanity check that CodeSearch + SymbolIndex compose the way
        // the search_code tool expects, independent of the orchestrator.
        let dir = tempdir().unwrap();
        let cas = Cas::open(dir.path().join("cas")).unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn widget() {}\nwidget();\n").unwrap();
        let mut idx = SymbolIndex::new();
        idx.index_files(&cas, dir.path(), &["a.rs".to_string()]);
        let idx_lock = RwLock::new(idx);
        let guard = idx_lock.read().unwrap();
        let search = CodeSearch::new(dir.path(), Some(&guard));
        let hits = search.search("widget", &["a.rs".to_string()], 10);
        assert!(!hits.is_empty());
    }
}
