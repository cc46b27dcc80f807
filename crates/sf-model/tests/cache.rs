//! Cache lifetime behavior against the weak registry, with wall-clock
//! timing as used in production.

use std::sync::Arc;
use std::time::Duration;

use sf_core::{StreamId, Time};
use sf_model::{Pick, PublicObject, PublicObjectCache, TimeQuantity};

fn new_pick() -> Arc<Pick> {
    Pick::create(
        StreamId::new("XX", "STA", "", "BHZ"),
        TimeQuantity::new(Time::EPOCH),
    )
}

#[test]
fn cache_eviction_recovery_and_release() {
    let mut cache = PublicObjectCache::new(Duration::from_secs(1));

    let mut pick = new_pick();
    let public_id = pick.public_id().to_string();
    assert!(cache.feed(pick.clone()));
    assert_eq!(cache.size(), 1);
    // One strong reference here, one inside the cache
    assert_eq!(Arc::strong_count(&pick), 2);

    // Retrieving the pick must succeed as nothing else has been added.
    pick = cache.get_as::<Pick>(&public_id).expect("cached pick");

    std::thread::sleep(Duration::from_secs(2));

    // Feed another pick. Since the span is one second the old entry is
    // evicted and only our local Arc keeps the pick alive.
    assert!(cache.feed(new_pick()));
    assert_eq!(cache.size(), 1);
    assert_eq!(Arc::strong_count(&pick), 1);

    // The pick is still in the registry because of the local Arc, and the
    // cache feeds back any object it recovers.
    pick = cache.get_as::<Pick>(&public_id).expect("recovered pick");
    assert_eq!(cache.size(), 2);
    assert_eq!(pick.public_id(), public_id);
    assert_eq!(Arc::strong_count(&pick), 2);

    std::thread::sleep(Duration::from_secs(2));
    assert!(cache.feed(new_pick()));
    assert_eq!(cache.size(), 1);

    // Release the last strong reference; now the lookup must fail.
    drop(pick);
    assert!(cache.get_as::<Pick>(&public_id).is_none());
}
