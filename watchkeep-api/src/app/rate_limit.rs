use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Sliding-window counter of events per key, kept in memory.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    buckets: Mutex<HashMap<String, Vec<Instant>>>,
    sweep_threshold: usize,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            buckets: Mutex::new(HashMap::new()),
            sweep_threshold: 1024,
        }
    }

    /// True while `key` has fewer than `limit` events inside the window. Records nothing.
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let buckets = self.buckets.lock().await;
        buckets.get(key).map_or(true, |times| {
            times
                .iter()
                .filter(|t| now.duration_since(**t) < self.window)
                .count()
                < self.limit
        })
    }

    /// Records one event for `key`.
    pub async fn record(&self, key: &str) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let entry = buckets.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);
        entry.push(now);
        if buckets.len() > self.sweep_threshold {
            buckets.retain(|_, times| {
                times.retain(|t| now.duration_since(*t) < self.window);
                !times.is_empty()
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_limit_per_key() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        limiter.record("10.0.0.1").await;
        assert!(limiter.check("10.0.0.1").await);
        limiter.record("10.0.0.1").await;
        assert!(!limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.2").await);
    }

    #[tokio::test]
    async fn check_does_not_count() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        for _ in 0..5 {
            assert!(limiter.check("k").await);
        }
    }

    #[tokio::test]
    async fn window_expires() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        limiter.record("k").await;
        assert!(!limiter.check("k").await);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.check("k").await);
    }
}
