//! src/rate_limit.rs
//!
//! Per-host politeness gate. One mutex guards a small map from host to the
//! next instant a request to that host may be dispatched; lookup and update
//! are the only operations ever performed while holding it, so contention is
//! brief even under many concurrent callers targeting distinct hosts.
//! Mirrors `rate_limit.py` in the original implementation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Per-host minimum-interval gate shared across all in-flight probes in one
/// scan. Missing hosts are treated as having `next_allowed_at = -inf`: the
/// first call for a host returns immediately and schedules the next.
pub struct HostRateLimiter {
    min_interval: Duration,
    next_allowed: Mutex<HashMap<String, Instant>>,
}

impl HostRateLimiter {
    pub fn new(min_interval_sec: f64) -> Self {
        HostRateLimiter {
            min_interval: Duration::from_secs_f64(min_interval_sec.max(0.0)),
            next_allowed: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks the caller until the wall-clock time reaches
    /// `next_allowed_at[host(url)]`, then atomically reserves the next slot
    /// for that host. Never panics on malformed input — a URL the `url`
    /// crate cannot parse falls back to the raw string as its own key.
    pub async fn wait(&self, url: &str) {
        let key = host_key(url);

        // Compute-and-reserve happens under the lock so exactly one caller
        // at a time is "inside" the critical section for a given host, but
        // the lock is held only for a map lookup + insert, never across the
        // subsequent sleep.
        let sleep_until = {
            let mut map = self.next_allowed.lock().expect("rate limiter mutex poisoned");
            let now = Instant::now();
            let next_allowed_at = map.get(&key).copied().unwrap_or(now);
            let dispatch_at = now.max(next_allowed_at);
            map.insert(key.clone(), dispatch_at + self.min_interval);
            dispatch_at
        };

        if sleep_until > Instant::now() {
            trace!(host = %key, "host gate waiting");
            tokio::time::sleep_until(sleep_until).await;
        }
    }
}

/// Extract the rate-limiting key from a URL: the lowercased, port-stripped
/// host. Scheme and path are irrelevant. Malformed URLs yield the full
/// input string as a synthetic key so the limiter never crashes.
fn host_key(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(h) => h.to_lowercase(),
            None => url.to_lowercase(),
        },
        Err(_) => url.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    #[test]
    fn host_key_strips_port_and_case() {
        assert_eq!(host_key("https://Example.com:8443/path"), "example.com");
        assert_eq!(host_key("http://example.com/"), "example.com");
    }

    #[test]
    fn host_key_never_panics_on_garbage() {
        assert_eq!(host_key("not a url at all"), "not a url at all");
        assert_eq!(host_key(""), "");
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_for_a_host_does_not_wait() {
        let limiter = HostRateLimiter::new(1.2);
        let start = Instant::now();
        limiter.wait("https://example.com/a").await;
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_same_host_waits_min_interval() {
        let limiter = HostRateLimiter::new(1.2);
        limiter.wait("https://example.com/a").await;
        let before_second = Instant::now();
        limiter.wait("https://example.com/b").await;
        let elapsed = Instant::now() - before_second;
        assert!(elapsed >= Duration::from_secs_f64(1.2));
    }

    #[tokio::test(start_paused = true)]
    async fn different_hosts_do_not_contend() {
        let limiter = HostRateLimiter::new(5.0);
        let start = Instant::now();
        limiter.wait("https://a.example/").await;
        limiter.wait("https://b.example/").await;
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test]
    async fn concurrent_waits_on_same_host_serialize_with_gap() {
        let limiter = Arc::new(HostRateLimiter::new(0.05));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.wait("https://example.com/x").await;
                Instant::now()
            }));
        }
        let mut times = Vec::new();
        for h in handles {
            times.push(h.await.unwrap());
        }
        times.sort();
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= StdDuration::from_millis(45));
        }
    }
}
