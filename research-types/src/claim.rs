//! Verified claims admitted into the running report.

use serde::{Deserialize, Serialize};

/// A claim the verifier has judged, with its supporting sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// The claim text.
    pub text: String,
    /// Source identifiers: URLs or repository-relative `path` / `path:line`
    /// references.
    pub sources: Vec<String>,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Whether the claim passed the verifier gate.
    pub verified: bool,
}

impl Claim {
    /// Build an admitted claim (`verified = true`, `confidence = 0.8`).
    pub fn admitted(text: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            text: text.into(),
            sources,
            confidence: 0.8,
            verified: true,
        }
    }

    /// Build a rejected claim (`verified = false`, `confidence = 0.2`).
    pub fn rejected(text: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            text: text.into(),
            sources,
            confidence: 0.2,
            verified: false,
        }
    }
}
