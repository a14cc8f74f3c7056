//! # research-scholar — scholar provider pool (C5)
//!
//! Wraps each [`ScholarProvider`] with a per-host token-bucket rate limiter
//! ([`governor`]) and a [`CircuitBreaker`]. `search` iterates providers in
//! a fixed order, retrying each with backed-off jitter, merges results
//! deduplicating on `(lowercased title, year)`, and never raises on
//! partial provider failure — a fully exhausted pool simply returns
//! whatever (possibly empty) set it collected.

mod circuit;

pub use circuit::CircuitBreaker;

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use research_types::{PaperMeta, ScholarError, ScholarProvider};
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

type Limiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Retry/backoff/breaker tuning for the pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Requests per second permitted per host.
    pub rate_per_sec: NonZeroU32,
    /// Token bucket burst capacity per host.
    pub burst: NonZeroU32,
    /// Maximum retry attempts per provider per `search` call.
    pub max_retries: u32,
    /// Base backoff delay; doubled per attempt, with jitter added.
    pub base_backoff: Duration,
    /// Consecutive failures before a provider's breaker opens.
    pub failure_threshold: u32,
    /// How long an open breaker stays open before a half-open probe.
    pub recovery_window: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            rate_per_sec: nonzero!(5u32),
            burst: nonzero!(5u32),
            max_retries: 2,
            base_backoff: Duration::from_millis(50),
            failure_threshold: 3,
            recovery_window: Duration::from_secs(30),
        }
    }
}

struct Entry {
    provider: Arc<dyn ScholarProvider>,
    limiter: Limiter,
    breaker: Mutex<CircuitBreaker>,
}

/// A pool of scholar providers, queried in registration order.
pub struct ScholarPool {
    entries: Vec<Entry>,
    config: PoolConfig,
}

impl ScholarPool {
    /// Build an empty pool with the given tuning.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            entries: Vec::new(),
            config,
        }
    }

    /// Register a provider. Providers are tried in registration order.
    pub fn register(&mut self, provider: Arc<dyn ScholarProvider>) {
        let quota = Quota::per_second(self.config.rate_per_sec).allow_burst(self.config.burst);
        self.entries.push(Entry {
            provider,
            limiter: RateLimiter::direct(quota),
            breaker: Mutex::new(CircuitBreaker::new(
                self.config.failure_threshold,
                self.config.recovery_window,
            )),
        });
    }

    /// Search every registered provider for up to `k` papers, deduplicated
    /// across providers. Never returns an error: a fully exhausted pool
    /// yields an empty (or partial) vector.
    pub async fn search(&self, query: &str, k: usize) -> Vec<PaperMeta> {
        let mut results = Vec::new();
        let mut seen: HashSet<(String, Option<u32>)> = HashSet::new();

        for entry in &self.entries {
            if results.len() >= k {
                break;
            }
            let skip = {
                let breaker = entry.breaker.lock().await;
                breaker.is_open()
            };
            if skip {
                let mut breaker = entry.breaker.lock().await;
                if !breaker.allow() {
                    tracing::debug!(host = entry.provider.host(), "scholar: circuit open, skipping");
                    continue;
                }
            }

            let mut attempt = 0u32;
            loop {
                entry.limiter.until_ready().await;
                match entry.provider.search(query, k).await {
                    Ok(papers) => {
                        entry.breaker.lock().await.record_success();
                        for p in papers {
                            let key = p.dedup_key();
                            if seen.insert(key) {
                                results.push(p);
                                if results.len() >= k {
                                    break;
                                }
                            }
                        }
                        break;
                    }
                    Err(e) => {
                        attempt += 1;
                        tracing::warn!(host = entry.provider.host(), attempt, error = %e, "scholar provider failed");
                        if attempt > self.config.max_retries {
                            entry.breaker.lock().await.record_failure();
                            break;
                        }
                        let backoff = self.config.base_backoff * 2u32.pow(attempt - 1);
                        let jitter = jitter_ms(attempt);
                        tokio::time::sleep(backoff + Duration::from_millis(jitter)).await;
                    }
                }
            }
        }

        results.truncate(k);
        results
    }
}

fn jitter_ms(seed: u32) -> u64 {
    use rand::Rng;
    rand::thread_rng().gen_range(0..(10 * (seed as u64 + 1)))
}
