//! The `RemoteReasoner` capability: an opaque text-in/text-out, optionally
//! tool-calling, reasoning backend. The core depends only on this trait;
//! the HTTP client that talks to a concrete API is a collaborator (see
//! spec.md §1, §6).

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a reasoner call. Transient statuses are expected to have
/// already been retried by the implementation's own backoff policy before
/// this is returned.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ReasonerError {
    /// Required credential/config missing.
    #[error("reasoner not configured: {0}")]
    NotConfigured(String),
    /// The request exceeded its timeout.
    #[error("reasoner call timed out")]
    Timeout,
    /// Transient network failure, retries exhausted.
    #[error("reasoner network error: {0}")]
    Network(String),
    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A structured function-call record attached to a reasoner reply.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReasonerToolCall {
    /// Name of the requested tool.
    pub name: String,
    /// Parameters for the tool, as a JSON object.
    pub parameters: serde_json::Value,
}

/// What a reasoner call returned: either a final text answer, or one or
/// more structured tool-call requests.
#[derive(Debug, Clone, PartialEq)]
pub enum ReasonerReply {
    /// The reasoner produced a final text message.
    Text(String),
    /// The reasoner requested one or more tool calls.
    ToolCalls(Vec<ReasonerToolCall>),
}

/// An opaque chat capability. Implementations wrap a concrete HTTP
/// chat-completions-style API; the core only ever sees this trait.
#[async_trait]
pub trait RemoteReasoner: Send + Sync {
    /// Send `prompt` (already including any injected tool schemas) and
    /// return the parsed reply.
    async fn chat(&self, prompt: &str, model: &str) -> Result<ReasonerReply, ReasonerError>;

    /// Ask a strict YES/NO question, used by the verifier's semantic
    /// support rule. Implementations MUST constrain the reply grammar to
    /// `YES` or `NO` (case-insensitive, optionally wrapped in whitespace).
    async fn ask_yes_no(&self, question: &str) -> Result<bool, ReasonerError>;
}

/// A reasoner that is never configured. Used when `OPENROUTER_API_KEY` is
/// absent, so the orchestrator falls back to local-only operation and the
/// verifier falls back to its rule-3b heuristic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReasoner;

#[async_trait]
impl RemoteReasoner for NullReasoner {
    async fn chat(&self, _prompt: &str, _model: &str) -> Result<ReasonerReply, ReasonerError> {
        Err(ReasonerError::NotConfigured(
            "OPENROUTER_API_KEY not set".into(),
        ))
    }

    async fn ask_yes_no(&self, _question: &str) -> Result<bool, ReasonerError> {
        Err(ReasonerError::NotConfigured(
            "OPENROUTER_API_KEY not set".into(),
        ))
    }
}
