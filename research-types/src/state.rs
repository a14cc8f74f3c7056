//! The Markovian loop state `R_t`: the only thing carried across turns.

use serde::{Deserialize, Serialize};

/// The orchestrator's entire inter-turn state. No other state survives
/// between stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    /// The user's original question.
    pub question: String,
    /// The compressed, token-capped running report.
    pub report: String,
    /// The most recent raw (pre-compression) observation.
    pub last_observation: String,
}

impl LoopState {
    /// Start a fresh loop state for `question`.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            report: String::new(),
            last_observation: String::new(),
        }
    }
}
