//! Sliding-window rate limiting for chat, REST, and (future) webhook
//! traffic.
//!
//! Generalizes the fixed-window counter into a true sliding window: each
//! key keeps a deque of accept timestamps, pruned on every check. This
//! is a few words more code than a fixed window and avoids the
//! burst-at-the-boundary behavior a fixed window allows.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::hash::Hash;
use std::net::IpAddr;
use std::time::{Duration, Instant};

pub struct SlidingWindowLimiter<K: Eq + Hash + Clone> {
    table: DashMap<K, VecDeque<Instant>>,
    limit: usize,
    window: Duration,
}

impl<K: Eq + Hash + Clone> SlidingWindowLimiter<K> {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            table: DashMap::new(),
            limit,
            window,
        }
    }

    /// Record an attempt for `key` now. Returns `true` if it's within the
    /// window's limit (and is recorded), `false` if it's over-limit (and
    /// not recorded).
    pub fn check(&self, key: K) -> bool {
        let now = Instant::now();
        let mut entry = self.table.entry(key).or_default();
        while let Some(&oldest) = entry.front() {
            if now.duration_since(oldest) > self.window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() < self.limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }

    /// Drop all state for `key`, e.g. on connection close.
    pub fn remove(&self, key: &K) {
        self.table.remove(key);
    }
}

/// At most 10 accepted chat messages per sliding 10-second window, per
/// connection.
pub type ChatRateLimiter = SlidingWindowLimiter<String>;

pub fn new_chat_rate_limiter() -> ChatRateLimiter {
    SlidingWindowLimiter::new(10, Duration::from_secs(10))
}

/// At most 100 requests per sliding 15-minute window, per remote address,
/// across all `/api/*` routes.
pub type RestRateLimiter = SlidingWindowLimiter<IpAddr>;

pub fn new_rest_rate_limiter() -> RestRateLimiter {
    SlidingWindowLimiter::new(100, Duration::from_secs(15 * 60))
}

/// At most 50 requests per sliding 1-minute window, per remote address,
/// at the webhook endpoint. No webhook route is exposed by this process
/// yet, so this limiter is constructed but unwired until one exists.
pub type WebhookRateLimiter = SlidingWindowLimiter<IpAddr>;

pub fn new_webhook_rate_limiter() -> WebhookRateLimiter {
    SlidingWindowLimiter::new(50, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_limit() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_secs(10));
        assert!(limiter.check("k".to_string()));
        assert!(limiter.check("k".to_string()));
        assert!(limiter.check("k".to_string()));
        assert!(!limiter.check("k".to_string()));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(10));
        assert!(limiter.check("a".to_string()));
        assert!(limiter.check("b".to_string()));
        assert!(!limiter.check("a".to_string()));
    }

    #[test]
    fn remove_clears_state() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(10));
        assert!(limiter.check("k".to_string()));
        assert!(!limiter.check("k".to_string()));
        limiter.remove(&"k".to_string());
        assert!(limiter.check("k".to_string()));
    }

    #[test]
    fn chat_limiter_admits_ten_per_window() {
        let limiter = new_chat_rate_limiter();
        for _ in 0..10 {
            assert!(limiter.check("conn-1".to_string()));
        }
        assert!(!limiter.check("conn-1".to_string()));
    }
}
