//! Alternates a reasoner-driven run between a primary and a cheaper
//! fallback model every `N` calls, trading cost for latency.

use std::sync::atomic::{AtomicU64, Ordering};

/// Picks between `primary` and `fallback` model identifiers. The sequence
/// of `next_model()` outputs at 1-based call index `i` equals `fallback`
/// iff `i mod interval == 0`.
pub struct ModelRouter {
    primary: String,
    fallback: String,
    interval: u64,
    calls: AtomicU64,
}

impl ModelRouter {
    /// Build a router. `interval` of `0` disables the fallback entirely
    /// (every call returns `primary`).
    pub fn new(primary: impl Into<String>, fallback: impl Into<String>, interval: u64) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
            interval,
            calls: AtomicU64::new(0),
        }
    }

    /// Return the model to use for the next call, advancing the counter.
    pub fn next_model(&self) -> String {
        let i = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.interval > 0 && i % self.interval == 0 {
            self.fallback.clone()
        } else {
            self.primary.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periodicity_matches_i_mod_n() {
        let router = ModelRouter::new("primary", "fallback", 3);
        let sequence: Vec<String> = (0..9).map(|_| router.next_model()).collect();
        for (idx, model) in sequence.iter().enumerate() {
            let i = (idx + 1) as u64;
            if i % 3 == 0 {
                assert_eq!(model, "fallback", "index {i}");
            } else {
                assert_eq!(model, "primary", "index {i}");
            }
        }
    }

    #[test]
    fn interval_one_always_returns_fallback() {
        let router = ModelRouter::new("primary", "fallback", 1);
        for _ in 0..5 {
            assert_eq!(router.next_model(), "fallback");
        }
    }

    #[test]
    fn interval_zero_disables_fallback() {
        let router = ModelRouter::new("primary", "fallback", 0);
        for _ in 0..5 {
            assert_eq!(router.next_model(), "primary");
        }
    }
}
