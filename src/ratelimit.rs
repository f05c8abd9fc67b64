use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Best-effort sliding-window counter per client. Not linearizable; a burst
/// of concurrent requests may slip a few over the limit.
pub struct RateLimiter<K> {
    limit: usize,
    window: Duration,
    state: Mutex<Window<K>>,
}

struct Window<K> {
    hits: HashMap<K, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl<K: Eq + Hash> Window<K> {
    /// Forget clients with no hit inside the window. Runs at most once per window.
    fn sweep(&mut self, now: Instant, window: Duration) {
        if let Some(last) = self.last_sweep {
            if now.saturating_duration_since(last) < window {
                return;
            }
        }
        self.hits.retain(|_, recent| {
            recent
                .back()
                .is_some_and(|newest| now.saturating_duration_since(*newest) < window)
        });
        self.last_sweep = Some(now);
    }
}

impl<K: Eq + Hash + Clone> RateLimiter<K> {
    pub fn per_minute(limit: usize) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Window {
                hits: HashMap::new(),
                last_sweep: None,
            }),
        }
    }

    /// Record a request at `now`; false when the client is over budget.
    pub fn check_at(&self, key: &K, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.sweep(now, self.window);
        let recent = state.hits.entry(key.clone()).or_default();

        while let Some(first) = recent.front() {
            if now.saturating_duration_since(*first) >= self.window {
                recent.pop_front();
            } else {
                break;
            }
        }

        if recent.len() >= self.limit {
            return false;
        }
        recent.push_back(now);
        true
    }

    pub fn check(&self, key: &K) -> bool {
        self.check_at(key, Instant::now())
    }

    /// Number of clients currently tracked.
    pub fn tracked(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.check_at(&"a", t0));
        assert!(limiter.check_at(&"a", t0 + Duration::from_secs(1)));
        assert!(!limiter.check_at(&"a", t0 + Duration::from_secs(2)));
        assert!(limiter.check_at(&"b", t0 + Duration::from_secs(2)));
        assert!(limiter.check_at(&"a", t0 + Duration::from_secs(61)));
    }

    #[test]
    fn test_idle_clients_are_forgotten() {
        let limiter = RateLimiter::per_minute(5);
        let t0 = Instant::now();
        for ip in 0..10_000u32 {
            assert!(limiter.check_at(&ip, t0));
        }
        assert_eq!(limiter.tracked(), 10_000);

        assert!(limiter.check_at(&7, t0 + Duration::from_secs(3_600)));
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn test_active_clients_survive_sweep() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.check_at(&"old", t0));
        assert!(limiter.check_at(&"busy", t0 + Duration::from_secs(50)));

        assert!(limiter.check_at(&"new", t0 + Duration::from_secs(70)));
        assert_eq!(limiter.tracked(), 2);
        assert!(!limiter.check_at(&"busy", t0 + Duration::from_secs(71)));
    }
}
