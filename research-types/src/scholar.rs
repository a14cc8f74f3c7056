//! The `ScholarProvider` capability: a pluggable adapter to an academic
//! metadata source, normalized to [`PaperMeta`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a scholar provider may raise for a single request. The pool
/// treats all of these as retryable up to its configured max, then as a
/// circuit-breaker failure.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ScholarError {
    /// The provider's upstream host is rate-limiting us.
    #[error("rate limited")]
    RateLimited,
    /// Transient network failure.
    #[error("network error: {0}")]
    Network(String),
    /// The provider returned a response this client could not parse.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Normalized paper metadata returned by any scholar provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperMeta {
    /// Provider-local identifier.
    pub id: String,
    /// Paper title.
    pub title: String,
    /// Author names.
    pub authors: Vec<String>,
    /// Publication venue, if known.
    #[serde(default)]
    pub venue: Option<String>,
    /// Publication year, if known.
    #[serde(default)]
    pub year: Option<u32>,
    /// Abstract text, if available.
    #[serde(default)]
    pub abstract_text: Option<String>,
    /// DOI, if available.
    #[serde(default)]
    pub doi: Option<String>,
    /// Landing page URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Direct PDF URL, if available.
    #[serde(default)]
    pub pdf_url: Option<String>,
    /// Name of the provider that produced this record.
    pub source: String,
}

impl PaperMeta {
    /// The `(lowercased title, year)` key used for cross-provider dedup.
    pub fn dedup_key(&self) -> (String, Option<u32>) {
        (self.title.to_lowercase(), self.year)
    }
}

/// A pluggable academic-literature search adapter. Each concrete
/// implementation talks to one upstream host; the pool (in
/// `research-scholar`) wraps it with rate limiting and a circuit breaker.
#[async_trait]
pub trait ScholarProvider: Send + Sync {
    /// Stable name identifying this provider, used for the `source` field
    /// and for per-host rate limiting.
    fn host(&self) -> &str;

    /// Search for up to `k` papers matching `query`.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<PaperMeta>, ScholarError>;
}
