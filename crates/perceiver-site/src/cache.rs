use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use sitelens_core_types::{DetectionResult, SharedClock};

pub const DEFAULT_DETECTION_TTL: Duration = Duration::from_millis(30_000);

/// Detection results keyed by URL. Expired entries are purged lazily, on the next
/// lookup of the same key.
pub struct DetectionCache {
    entries: DashMap<String, (DetectionResult, std::time::Instant)>,
    ttl_ms: AtomicU64,
    clock: SharedClock,
}

impl DetectionCache {
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_ms: AtomicU64::new(duration_to_millis(ttl)),
            clock,
        }
    }

    pub fn put(&self, key: String, result: DetectionResult) {
        self.entries.insert(key, (result, self.clock.now()));
    }

    pub fn set_ttl(&self, ttl: Duration) {
        self.ttl_ms
            .store(duration_to_millis(ttl), Ordering::Relaxed);
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.load(Ordering::Relaxed))
    }

    /// Cached copy (flagged `from_cache`) while the entry is younger than the TTL.
    pub fn get(&self, key: &str) -> Option<DetectionResult> {
        let ttl = self.ttl();
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if now.saturating_duration_since(entry.1) < ttl {
                    return Some(entry.0.cached_copy());
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitelens_core_types::{DetectionSignals, ManualClock, SiteId};

    fn matched(url: &str) -> DetectionResult {
        DetectionResult::matched(
            url,
            SiteId::new("siteA"),
            DetectionSignals {
                url_score: 0.7,
                ..Default::default()
            },
        )
    }

    #[test]
    fn entry_valid_for_exactly_the_ttl() {
        let clock = ManualClock::shared();
        let cache = DetectionCache::new(DEFAULT_DETECTION_TTL, clock.clone());
        cache.put("https://a.example/".into(), matched("https://a.example/"));

        clock.advance(Duration::from_millis(29_999));
        let hit = cache.get("https://a.example/").expect("still fresh");
        assert!(hit.from_cache);

        clock.advance(Duration::from_millis(1));
        assert!(cache.get("https://a.example/").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn expiry_is_lazy_and_per_key() {
        let clock = ManualClock::shared();
        let cache = DetectionCache::new(Duration::from_millis(100), clock.clone());
        cache.put("a".into(), matched("a"));
        cache.put("b".into(), matched("b"));
        clock.advance(Duration::from_millis(500));

        // nothing purged until a lookup touches the key
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn ttl_can_be_tuned() {
        let clock = ManualClock::shared();
        let cache = DetectionCache::new(DEFAULT_DETECTION_TTL, clock.clone());
        cache.set_ttl(Duration::from_millis(10));
        assert_eq!(cache.ttl(), Duration::from_millis(10));
        cache.put("a".into(), matched("a"));
        clock.advance(Duration::from_millis(10));
        assert!(cache.get("a").is_none());
    }
}
