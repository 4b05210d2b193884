// Per-user quota gate for scan attempts
// Consulted before any external call; a rejection must never reach the provider

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

const MINUTE_SECS: u64 = 60;
const DAY_SECS: u64 = 86_400;

/// Counter storage with atomic increment-and-return semantics.
///
/// The in-memory implementation below is process-local only; swapping in a
/// distributed store (e.g. Redis INCR + EXPIRE) must not change call sites.
pub trait CounterStore: Send + Sync {
    /// Increment the counter behind `key` and return the new count.
    /// The entry expires `ttl` after its first increment.
    fn increment(&self, key: &str, ttl: Duration) -> u64;
}

struct CounterSlot {
    count: u64,
    expires_at: Instant,
}

/// In-memory counter store backed by a concurrent map.
///
/// The per-entry lock of the map gives the atomic increment-and-compare the
/// limiter needs: two simultaneous calls on the same key always observe
/// distinct counts. Not correct across multiple process instances.
#[derive(Default)]
pub struct InMemoryCounterStore {
    counters: DashMap<String, CounterSlot>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for InMemoryCounterStore {
    fn increment(&self, key: &str, ttl: Duration) -> u64 {
        let now = Instant::now();
        let mut slot = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| CounterSlot {
                count: 0,
                expires_at: now + ttl,
            });

        // Stale entries are recycled on touch rather than swept
        if slot.expires_at <= now {
            slot.count = 0;
            slot.expires_at = now + ttl;
        }

        slot.count += 1;
        slot.count
    }
}

/// Sliding-window approximation over truncated timestamp buckets.
///
/// Two independent windows per user: one minute capped at `minute_cap`
/// attempts and one day capped at `daily_cap`. Keys truncate the timestamp to
/// the bucket size, so a burst straddling a bucket boundary can briefly admit
/// more than the cap across two buckets; accepted approximation.
pub struct RateLimiter {
    store: Box<dyn CounterStore>,
    minute_cap: u64,
    daily_cap: u64,
}

impl RateLimiter {
    pub fn new(store: Box<dyn CounterStore>, minute_cap: u64, daily_cap: u64) -> Self {
        Self {
            store,
            minute_cap,
            daily_cap,
        }
    }

    /// Check and consume quota for one scan attempt.
    ///
    /// Returns `true` and records the attempt atomically, or `false` without
    /// consuming quota. The minute window is checked before the day window so
    /// a minute-capped burst never drains the daily budget.
    pub fn allow(&self, user_id: i64) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        self.allow_at(user_id, now)
    }

    /// `allow` with an explicit unix timestamp, for deterministic tests.
    pub fn allow_at(&self, user_id: i64, unix_secs: u64) -> bool {
        let minute_key = format!("scan_min_{}_{}", user_id, unix_secs / MINUTE_SECS);
        let day_key = format!("scan_day_{}_{}", user_id, unix_secs / DAY_SECS);

        // Counts past the cap never admit anything (comparison is strict),
        // so over-cap increments on rejected attempts are harmless noise
        // within an already-exhausted bucket.
        let minute_count = self
            .store
            .increment(&minute_key, Duration::from_secs(MINUTE_SECS));
        if minute_count > self.minute_cap {
            log::warn!("rate limit (minute) exceeded for user {}", user_id);
            return false;
        }

        let day_count = self.store.increment(&day_key, Duration::from_secs(DAY_SECS));
        if day_count > self.daily_cap {
            log::warn!("rate limit (daily) exceeded for user {}", user_id);
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn limiter(minute_cap: u64, daily_cap: u64) -> RateLimiter {
        RateLimiter::new(Box::new(InMemoryCounterStore::new()), minute_cap, daily_cap)
    }

    #[test]
    fn test_sixth_call_in_same_minute_rejected() {
        let limiter = limiter(5, 25);
        let t = 1_700_000_000;

        for _ in 0..5 {
            assert!(limiter.allow_at(7, t));
        }
        assert!(!limiter.allow_at(7, t + 30));
    }

    #[test]
    fn test_minute_window_resets_in_next_bucket() {
        let limiter = limiter(5, 25);
        let t = 1_700_000_000 - (1_700_000_000 % 60);

        for _ in 0..5 {
            assert!(limiter.allow_at(7, t));
        }
        assert!(!limiter.allow_at(7, t + 1));
        // Next minute bucket
        assert!(limiter.allow_at(7, t + 60));
    }

    #[test]
    fn test_daily_cap_rejects_26th_call_across_minutes() {
        let limiter = limiter(5, 25);
        let t = 1_700_000_000 - (1_700_000_000 % DAY_SECS);

        // One call per minute, far under the per-minute cap
        for i in 0..25 {
            assert!(limiter.allow_at(7, t + i * 60));
        }
        assert!(!limiter.allow_at(7, t + 25 * 60));
    }

    #[test]
    fn test_minute_rejection_does_not_consume_daily_quota() {
        let limiter = limiter(2, 3);
        let t = 1_700_000_000 - (1_700_000_000 % DAY_SECS);

        assert!(limiter.allow_at(7, t));
        assert!(limiter.allow_at(7, t));
        // Minute-capped; must not count against the day
        assert!(!limiter.allow_at(7, t));
        assert!(!limiter.allow_at(7, t));

        // Next minute: one daily slot must still be available
        assert!(limiter.allow_at(7, t + 60));
        assert!(!limiter.allow_at(7, t + 120));
    }

    #[test]
    fn test_users_do_not_share_quota() {
        let limiter = limiter(1, 25);
        let t = 1_700_000_000;

        assert!(limiter.allow_at(1, t));
        assert!(limiter.allow_at(2, t));
        assert!(!limiter.allow_at(1, t));
    }

    #[test]
    fn test_concurrent_increments_do_not_lose_updates() {
        let store = Arc::new(InMemoryCounterStore::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    store.increment("shared", Duration::from_secs(60));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.increment("shared", Duration::from_secs(60)), 801);
    }
}
