//! Pseudonym Cache: a capacity- and time-bounded record of recently emitted
//! pseudonyms, used to deduplicate pseudonym record emission.

use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Injectable time source so cache expiry is testable without real sleeps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A fixed instant for tests; advance it explicitly between assertions.
pub struct FixedClock {
    now: std::cell::Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::cell::Cell::new(now),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Time-bounded + capacity-bounded LRU cache of pseudonym -> last-emit
/// timestamp. Eviction: on insert when full, drop least-recently-used; on
/// lookup, entries older than retention are treated as absent and purged.
///
/// Retention is a [`chrono::Duration`] rather than a bare day count: the
/// `max_caching_days` config key is whole days, but dedup windows as short
/// as a few hundred milliseconds need to be testable, so the cache itself
/// takes a `Duration` and `PseudonymizerConfig` converts its integer day
/// count at construction time.
pub struct PseudonymCache<C: Clock> {
    entries: LruCache<String, DateTime<Utc>>,
    retention: chrono::Duration,
    clock: C,
}

impl<C: Clock> PseudonymCache<C> {
    pub fn new(max_cached_pseudonyms: usize, retention: chrono::Duration, clock: C) -> Self {
        let capacity = NonZeroUsize::new(max_cached_pseudonyms.max(1)).unwrap();
        Self {
            entries: LruCache::new(capacity),
            retention,
            clock,
        }
    }

    /// True if `pseudonym` was seen within the retention window. Expired
    /// entries are purged as a side effect of the lookup (lazy expiry).
    pub fn contains_fresh(&mut self, pseudonym: &str) -> bool {
        let now = self.clock.now();
        match self.entries.get(pseudonym) {
            Some(seen_at) => {
                let age = now - *seen_at;
                if age > self.retention {
                    self.entries.pop(pseudonym);
                    false
                } else {
                    true
                }
            }
            None => false,
        }
    }

    /// Record `pseudonym` as emitted at the current clock time, evicting
    /// the least-recently-used entry if the cache is at capacity.
    pub fn record(&mut self, pseudonym: impl Into<String>) {
        let now = self.clock.now();
        self.entries.put(pseudonym.into(), now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn epoch() -> DateTime<Utc> {
        "2024-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn fresh_entry_suppresses_duplicate_emission() {
        let clock = FixedClock::new(epoch());
        let mut cache = PseudonymCache::new(10, Duration::days(1), clock);
        assert!(!cache.contains_fresh("abc"));
        cache.record("abc");
        assert!(cache.contains_fresh("abc"));
    }

    #[test]
    fn entry_expires_after_retention_window() {
        let clock = FixedClock::new(epoch());
        let mut cache = PseudonymCache::new(10, Duration::days(1), clock);
        cache.record("abc");
        cache.clock.advance(Duration::days(2));
        assert!(!cache.contains_fresh("abc"));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn capacity_overflow_evicts_least_recently_used() {
        let clock = FixedClock::new(epoch());
        let mut cache = PseudonymCache::new(2, Duration::days(365), clock);
        cache.record("a");
        cache.record("b");
        cache.contains_fresh("a");
        cache.record("c");
        assert!(!cache.contains_fresh("b"));
        assert!(cache.contains_fresh("a"));
        assert!(cache.contains_fresh("c"));
    }

    #[test]
    fn sub_day_retention_window_for_cache_dedup_scenario() {
        let clock = FixedClock::new(epoch());
        let mut cache = PseudonymCache::new(10, Duration::milliseconds(100), clock);
        cache.record("abc");
        assert!(cache.contains_fresh("abc"));
        cache.clock.advance(Duration::milliseconds(50));
        assert!(cache.contains_fresh("abc"));
        cache.clock.advance(Duration::milliseconds(60));
        assert!(!cache.contains_fresh("abc"));
    }
}
