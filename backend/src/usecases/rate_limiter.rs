use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

/// Entries kept before `check` prunes elapsed windows on its own.
pub const DEFAULT_SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
}

impl RateLimitPolicy {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests,
        }
    }

    pub fn per_hour(max_requests: u32) -> Self {
        Self {
            window: Duration::from_secs(60 * 60),
            max_requests,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until the current window closes. Zero when allowed.
    pub retry_after: Duration,
}

pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str) -> RateLimitDecision;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: Instant,
}

/// Fixed-window counter per client key. Process-local; counts are lost on restart.
pub struct InMemoryRateLimiter {
    policy: RateLimitPolicy,
    entries: DashMap<String, Window>,
    sweep_threshold: usize,
}

impl InMemoryRateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_sweep_threshold(policy, DEFAULT_SWEEP_THRESHOLD)
    }

    pub fn with_sweep_threshold(policy: RateLimitPolicy, sweep_threshold: usize) -> Self {
        Self {
            policy,
            entries: DashMap::new(),
            sweep_threshold,
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        if self.entries.len() > self.sweep_threshold {
            self.sweep_at(now);
        }

        let max_requests = self.policy.max_requests;
        if max_requests == 0 {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after: self.policy.window,
            };
        }

        let mut window = self.entries.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });

        let elapsed = now.saturating_duration_since(window.started_at);
        if window.count == 0 || elapsed >= self.policy.window {
            window.count = 1;
            window.started_at = now;
            return RateLimitDecision {
                allowed: true,
                remaining: max_requests - 1,
                retry_after: Duration::ZERO,
            };
        }

        if window.count < max_requests {
            window.count += 1;
            return RateLimitDecision {
                allowed: true,
                remaining: max_requests - window.count,
                retry_after: Duration::ZERO,
            };
        }

        RateLimitDecision {
            allowed: false,
            remaining: 0,
            retry_after: self.policy.window - elapsed,
        }
    }

    /// Drops every key whose window has elapsed and returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        let window = self.policy.window;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.started_at) < window);
        before.saturating_sub(self.entries.len())
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }
}

pub fn spawn_sweeper(limiters: Vec<Arc<InMemoryRateLimiter>>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed: usize = limiters.iter().map(|limiter| limiter.sweep()).sum();
            if removed > 0 {
                debug!(removed, "rate_limiter: swept elapsed windows");
            }
        }
    })
}
