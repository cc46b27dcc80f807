//! Public object registry
//!
//! Every public object owns a stable public-id string, unique within the
//! registry while any strong reference to the object is alive. The
//! registry itself holds weak references only; it never keeps an object
//! alive and prunes dead slots opportunistically.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

use sf_core::Time;

/// An object identified by a persistent public id.
pub trait PublicObject: Send + Sync + 'static {
    fn public_id(&self) -> &str;

    /// Upcast for typed cache lookups.
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Generate a fresh public id: `prefix/yyyymmdd.hhmmss.counter`.
pub fn generate_public_id(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let stamp = Time::now().to_datetime().format("%Y%m%d.%H%M%S");
    format!("{prefix}/{stamp}.{n}")
}

type SharedObject = Arc<dyn PublicObject>;
type WeakObject = Weak<dyn PublicObject>;

/// Process-wide weak index keyed by public id.
#[derive(Default)]
pub struct PublicObjectRegistry {
    objects: RwLock<HashMap<String, WeakObject>>,
}

impl PublicObjectRegistry {
    /// The global registry instance.
    pub fn global() -> &'static PublicObjectRegistry {
        static GLOBAL: OnceLock<PublicObjectRegistry> = OnceLock::new();
        GLOBAL.get_or_init(PublicObjectRegistry::default)
    }

    /// Register an object under its public id. Fails if another live
    /// object already owns the id.
    pub fn register(&self, object: &SharedObject) -> bool {
        let id = object.public_id().to_string();
        let mut map = self.objects.write();
        if let Some(existing) = map.get(&id) {
            if existing.strong_count() > 0 {
                log::warn!("public id '{id}' already registered");
                return false;
            }
        }
        map.insert(id, Arc::downgrade(object));
        true
    }

    /// Look up a live object by public id. Dead slots are pruned on the
    /// way.
    pub fn find(&self, public_id: &str) -> Option<SharedObject> {
        {
            let map = self.objects.read();
            match map.get(public_id) {
                Some(weak) => {
                    if let Some(obj) = weak.upgrade() {
                        return Some(obj);
                    }
                }
                None => return None,
            }
        }
        // Entry exists but the object is gone
        self.objects.write().remove(public_id);
        None
    }

    /// Number of live entries.
    pub fn live_count(&self) -> usize {
        self.objects
            .read()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Drop every slot whose object has been released.
    pub fn prune(&self) {
        self.objects.write().retain(|_, w| w.strong_count() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        id: String,
    }

    impl PublicObject for Dummy {
        fn public_id(&self) -> &str {
            &self.id
        }

        fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn dummy(id: &str) -> SharedObject {
        Arc::new(Dummy { id: id.into() })
    }

    #[test]
    fn test_register_find_release() {
        let registry = PublicObjectRegistry::default();
        let obj = dummy("test/registry/1");
        assert!(registry.register(&obj));

        // Second registration under the same live id fails
        assert!(!registry.register(&dummy("test/registry/1")));

        assert!(registry.find("test/registry/1").is_some());
        drop(obj);
        assert!(registry.find("test/registry/1").is_none());

        // The id is reusable once the object has died
        assert!(registry.register(&dummy("test/registry/1")));
    }

    #[test]
    fn test_prune_removes_dead_slots() {
        let registry = PublicObjectRegistry::default();
        let obj = dummy("test/registry/2");
        registry.register(&obj);
        drop(obj);
        registry.prune();
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_public_id("Pick");
        let b = generate_public_id("Pick");
        assert_ne!(a, b);
        assert!(a.starts_with("Pick/"));
    }
}
