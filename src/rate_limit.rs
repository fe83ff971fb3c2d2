use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use dashmap::DashMap;

/// Sliding window limiter keyed by client (process local).
#[derive(Clone)]
pub struct SubmitRateLimiter {
    hits: Arc<DashMap<String, VecDeque<Instant>>>,
    cfg: RateLimitConfig,
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub submit_limit: usize,
    pub submit_window: Duration,
    /// Key clients on X-Forwarded-For / Forwarded. Only safe behind a proxy that overwrites them.
    pub trust_forwarded: bool,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        fn usize_env(name: &str, default: usize) -> usize { std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default) }
        fn bool_env(name: &str, default: bool) -> bool { std::env::var(name).map(|v| v != "0" && !v.eq_ignore_ascii_case("false")).unwrap_or(default) }
        Self {
            enabled: bool_env("RL_ENABLED", true),
            submit_limit: usize_env("RL_SUBMIT_LIMIT", 5),
            submit_window: Duration::from_secs(usize_env("RL_SUBMIT_WINDOW", 600) as u64),
            trust_forwarded: bool_env("RL_TRUST_FORWARDED", false),
        }
    }
}

// expired clients are swept once the map holds this many keys
const SWEEP_THRESHOLD: usize = 1024;

impl SubmitRateLimiter {
    pub fn new(cfg: RateLimitConfig) -> Self {
        Self { hits: Arc::new(DashMap::new()), cfg }
    }

    pub fn trusts_forwarded(&self) -> bool {
        self.cfg.trust_forwarded
    }

    pub fn tracked_clients(&self) -> usize {
        self.hits.len()
    }

    /// Drops every client whose attempts have all left the window.
    pub fn sweep(&self) {
        let now = Instant::now();
        let window = self.cfg.submit_window;
        self.hits.retain(|_, q| q.back().is_some_and(|t| now.duration_since(*t) < window));
    }

    /// Records an attempt for `client`; false once the window is full.
    pub fn allow_submit(&self, client: &str) -> bool {
        if !self.cfg.enabled { return true; }
        if self.hits.len() >= SWEEP_THRESHOLD {
            self.sweep();
        }
        let now = Instant::now();
        let mut entry = self.hits.entry(client.to_string()).or_default();
        while entry.front().is_some_and(|t| now.duration_since(*t) >= self.cfg.submit_window) {
            entry.pop_front();
        }
        if entry.len() >= self.cfg.submit_limit {
            return false;
        }
        entry.push_back(now);
        true
    }
}
