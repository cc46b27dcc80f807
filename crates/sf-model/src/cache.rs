//! Time-span bounded object cache
//!
//! Keeps a strong reference to every fed object for a configurable span
//! after its last touch. Objects evicted from the cache but still alive
//! elsewhere are transparently recovered from the weak registry on lookup
//! and re-inserted; objects nobody holds anymore are gone for good. The
//! cache ranks entries by freshness alone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{PublicObject, PublicObjectRegistry};

struct CacheEntry {
    object: Arc<dyn PublicObject>,
    touched: Instant,
}

pub struct PublicObjectCache {
    registry: &'static PublicObjectRegistry,
    span: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl PublicObjectCache {
    /// Cache backed by the global registry.
    pub fn new(span: Duration) -> Self {
        Self::with_registry(PublicObjectRegistry::global(), span)
    }

    pub fn with_registry(registry: &'static PublicObjectRegistry, span: Duration) -> Self {
        Self {
            registry,
            span,
            entries: HashMap::new(),
        }
    }

    pub fn span(&self) -> Duration {
        self.span
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Insert or refresh an entry for the object's public id.
    pub fn feed(&mut self, object: Arc<dyn PublicObject>) -> bool {
        self.evict_expired(Instant::now());
        let id = object.public_id().to_string();
        self.entries.insert(
            id,
            CacheEntry {
                object,
                touched: Instant::now(),
            },
        );
        true
    }

    /// Look up by public id, recovering from the registry when the entry
    /// has been evicted but the object is still referenced elsewhere.
    pub fn get(&mut self, public_id: &str) -> Option<Arc<dyn PublicObject>> {
        self.evict_expired(Instant::now());

        if let Some(entry) = self.entries.get_mut(public_id) {
            entry.touched = Instant::now();
            return Some(entry.object.clone());
        }

        // Not cached: the weak registry may still know the object. Any hit
        // is fed back so the cache stays authoritative for a while.
        let object = self.registry.find(public_id)?;
        log::debug!("cache: recovered '{public_id}' from registry");
        self.feed(object.clone());
        Some(object)
    }

    /// Typed lookup.
    pub fn get_as<T: PublicObject>(&mut self, public_id: &str) -> Option<Arc<T>> {
        self.get(public_id)?.as_any_arc().downcast::<T>().ok()
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.entries.contains_key(public_id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_expired(&mut self, now: Instant) {
        let span = self.span;
        self.entries
            .retain(|_, entry| now.duration_since(entry.touched) <= span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pick, TimeQuantity};
    use sf_core::{StreamId, Time};

    fn new_pick() -> Arc<Pick> {
        Pick::create(
            StreamId::new("XX", "STA", "", "BHZ"),
            TimeQuantity::new(Time::EPOCH),
        )
    }

    #[test]
    fn test_feed_then_get() {
        let mut cache = PublicObjectCache::new(Duration::from_secs(10));
        let pick = new_pick();
        let id = pick.public_id().to_string();
        assert!(cache.feed(pick.clone()));
        assert_eq!(cache.size(), 1);

        let hit = cache.get(&id).expect("cached object");
        assert_eq!(hit.public_id(), id);
        let typed = cache.get_as::<Pick>(&id).expect("typed hit");
        assert_eq!(typed.public_id(), id);
    }

    #[test]
    fn test_eviction_and_recovery() {
        let mut cache = PublicObjectCache::new(Duration::from_millis(50));
        let pick = new_pick();
        let id = pick.public_id().to_string();
        cache.feed(pick.clone());

        std::thread::sleep(Duration::from_millis(120));
        // Another feed triggers maintenance and evicts the stale entry
        cache.feed(new_pick());
        assert_eq!(cache.size(), 1);
        assert!(!cache.contains(&id));

        // Still alive through `pick`, so the registry recovers it
        let recovered = cache.get(&id).expect("recovered from registry");
        assert_eq!(recovered.public_id(), id);
        assert!(cache.contains(&id));
    }

    #[test]
    fn test_released_object_is_gone() {
        let mut cache = PublicObjectCache::new(Duration::from_millis(50));
        let pick = new_pick();
        let id = pick.public_id().to_string();
        cache.feed(pick.clone());
        drop(pick);

        std::thread::sleep(Duration::from_millis(120));
        cache.feed(new_pick());
        assert!(cache.get(&id).is_none());
    }

    #[test]
    fn test_touch_extends_lifetime() {
        let mut cache = PublicObjectCache::new(Duration::from_millis(100));
        let pick = new_pick();
        let id = pick.public_id().to_string();
        cache.feed(pick);

        for _ in 0..4 {
            std::thread::sleep(Duration::from_millis(50));
            assert!(cache.get(&id).is_some(), "touch must refresh the entry");
        }
    }
}
