//! # research-policy — the delegation policy (C7)
//!
//! Enforces per-agent call/token budgets, compresses tool output to a
//! bounded size before it is allowed into the running report, and exposes
//! monotonic metrics counters.

use research_types::AgentBudget;
use std::collections::HashMap;
use std::sync::Mutex;

/// Default token cap applied when compressing a single call's output,
/// independent of the agent's remaining budget.
pub const DEFAULT_COMPRESSION_CAP: usize = 400;

/// Position after which the compressor will look for a sentence boundary
/// to truncate at, rather than cutting mid-token-count.
const SENTENCE_SEARCH_START: usize = 20;

const ELLIPSIS: &str = " …";

/// Per-agent budgets plus monotonic metrics counters.
pub struct DelegationPolicy {
    budgets: Mutex<HashMap<String, AgentBudget>>,
    metrics: Mutex<HashMap<String, u64>>,
    compression_cap: usize,
}

impl DelegationPolicy {
    /// Build a policy with no registered agents.
    pub fn new() -> Self {
        Self {
            budgets: Mutex::new(HashMap::new()),
            metrics: Mutex::new(HashMap::new()),
            compression_cap: DEFAULT_COMPRESSION_CAP,
        }
    }

    /// Build a policy overriding the default compression cap.
    pub fn with_compression_cap(compression_cap: usize) -> Self {
        Self {
            compression_cap,
            ..Self::new()
        }
    }

    /// Register `agent_id` with a fresh budget, overwriting any existing
    /// registration.
    pub fn register(&self, agent_id: impl Into<String>, max_calls: u64, max_tokens: u64) {
        let mut budgets = self.budgets.lock().expect("budgets lock poisoned");
        budgets.insert(agent_id.into(), AgentBudget::new(max_calls, max_tokens));
    }

    fn bump(&self, key: impl Into<String>) {
        let mut metrics = self.metrics.lock().expect("metrics lock poisoned");
        *metrics.entry(key.into()).or_insert(0) += 1;
    }

    /// Current value of a metric counter (0 if never incremented).
    pub fn metric(&self, key: &str) -> u64 {
        self.metrics.lock().expect("metrics lock poisoned").get(key).copied().unwrap_or(0)
    }

    /// Whether `agent_id` may make another call: `false` if no budget is
    /// registered, or the budget is already at its limit.
    pub fn allow(&self, agent_id: &str) -> bool {
        let budgets = self.budgets.lock().expect("budgets lock poisoned");
        match budgets.get(agent_id) {
            Some(budget) => !budget.at_limit(),
            None => false,
        }
    }

    /// Record a call for `agent_id`, compressing `raw_text` to fit the
    /// smaller of the agent's remaining token budget and the
    /// configured compression cap, incrementing usage counters atomically
    /// with the compression decision. If `agent_id` is not allowed to
    /// call (no budget, or at limit), records a denial and returns `None`
    /// without compressing or charging anything.
    pub fn record(&self, agent_id: &str, raw_text: &str) -> Option<String> {
        let mut budgets = self.budgets.lock().expect("budgets lock poisoned");
        let Some(budget) = budgets.get_mut(agent_id) else {
            drop(budgets);
            self.bump(format!("deny.{agent_id}"));
            return None;
        };
        if budget.at_limit() {
            drop(budgets);
            self.bump(format!("deny.{agent_id}"));
            return None;
        }

        let cap = (budget.remaining_tokens() as usize).min(self.compression_cap);
        let (compressed, tokens_used) = compress(raw_text, cap);
        budget.record(tokens_used as u64);
        drop(budgets);

        self.bump(format!("calls.{agent_id}"));
        self.bump("calls.total");
        Some(compressed)
    }
}

impl Default for DelegationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate `text` to at most `cap` whitespace-split tokens, preferring to
/// end at a sentence boundary (`.`, `!`, `?`) found at or after token
/// position [`SENTENCE_SEARCH_START`]. Returns the (possibly truncated)
/// text and the number of tokens it now contains.
fn compress(text: &str, cap: usize) -> (String, usize) {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() <= cap {
        return (text.to_string(), tokens.len());
    }
    if cap == 0 {
        return (String::new(), 0);
    }

    let mut cut = cap;
    if cap > SENTENCE_SEARCH_START {
        for idx in (SENTENCE_SEARCH_START..cap).rev() {
            if let Some(tok) = tokens.get(idx) {
                if tok.ends_with(['.', '!', '?']) {
                    cut = idx + 1;
                    break;
                }
            }
        }
    }

    let mut truncated = tokens[..cut].join(" ");
    truncated.push_str(ELLIPSIS);
    (truncated, cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_false_without_budget() {
        let policy = DelegationPolicy::new();
        assert!(!policy.allow("nobody"));
    }

    #[test]
    fn allow_false_when_at_limit() {
        let policy = DelegationPolicy::new();
        policy.register("a", 1, 1000);
        assert!(policy.record("a", "hello world").is_some());
        assert!(!policy.allow("a"));
    }

    #[test]
    fn record_denies_past_limit_and_bumps_deny_metric() {
        let policy = DelegationPolicy::new();
        policy.register("search_papers", 1, 500);
        assert!(policy.record("search_papers", "first call").is_some());
        assert!(policy.record("search_papers", "second call").is_none());
        assert_eq!(policy.metric("deny.search_papers"), 1);
    }

    #[test]
    fn compress_truncates_at_sentence_boundary() {
        let mut text = String::new();
        for i in 0..50 {
            if i == 24 {
                text.push_str("End.");
            } else {
                text.push_str("word");
            }
            text.push(' ');
        }
        let (compressed, _tokens) = compress(&text, 30);
        assert!(compressed.contains("End."));
        assert!(compressed.ends_with(ELLIPSIS));
    }

    #[test]
    fn compress_is_noop_under_cap() {
        let (compressed, tokens) = compress("short text here", 100);
        assert_eq!(compressed, "short text here");
        assert_eq!(tokens, 3);
    }

    #[test]
    fn calls_total_is_monotonic_across_agents() {
        let policy = DelegationPolicy::new();
        policy.register("a", 10, 1000);
        policy.register("b", 10, 1000);
        policy.record("a", "x");
        policy.record("b", "y");
        assert_eq!(policy.metric("calls.total"), 2);
        assert_eq!(policy.metric("calls.a"), 1);
        assert_eq!(policy.metric("calls.b"), 1);
    }

    #[test]
    fn budget_soundness_never_exceeds_caps() {
        let policy = DelegationPolicy::new();
        policy.register("a", 3, 10);
        for _ in 0..5 {
            policy.record("a", "one two three four five six seven eight nine ten");
        }
        let budgets = policy.budgets.lock().unwrap();
        let b = budgets.get("a").unwrap();
        assert!(b.calls_used <= b.max_calls);
        assert!(b.tokens_used <= b.max_tokens || b.calls_used == 1);
    }
}
